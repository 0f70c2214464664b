use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::error::ToolError;

/// An auxiliary package injected into a tool's environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraRequirement {
    pub name: String,
    pub constraint: Option<Constraint>,
}

impl ExtraRequirement {
    pub fn new(name: impl Into<String>, constraint: Option<Constraint>) -> Self {
        Self {
            name: name.into(),
            constraint,
        }
    }

    /// Parses `name` or `name<constraint>` as passed on a command line.
    pub fn parse(input: &str) -> Result<Self, ToolError> {
        let trimmed = input.trim();
        let split_at = trimmed
            .find(&['<', '>', '=', '!', '~'][..])
            .unwrap_or(trimmed.len());
        let (name, constraint) = trimmed.split_at(split_at);
        RawExtra::Pinned(BTreeMap::from([(name.trim().to_string(), constraint.to_string())]))
            .normalize()
            .map_err(|err| ToolError::invocation(format!("invalid extra '{trimmed}': {err}")))
    }

    /// The requirement string handed to `uv --with`.
    pub fn requirement(&self) -> String {
        match &self.constraint {
            Some(constraint) => format!("{}{}", self.name, constraint.normalized()),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ExtraRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.requirement())
    }
}

/// Extras as written in a state file: a bare name or `{ name = "constraint" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawExtra {
    Name(String),
    Pinned(BTreeMap<String, String>),
}

impl RawExtra {
    pub fn normalize(self) -> Result<ExtraRequirement, ToolError> {
        let (name, constraint) = match self {
            Self::Name(name) => (name, None),
            Self::Pinned(map) => {
                if map.len() != 1 {
                    return Err(ToolError::invocation(format!(
                        "an extra mapping must have exactly one key, got {}",
                        map.len()
                    )));
                }
                let Some((name, constraint)) = map.into_iter().next() else {
                    return Err(ToolError::invocation("an extra mapping must not be empty"));
                };
                (name, Some(constraint))
            }
        };

        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ToolError::invocation("extra package name must not be empty"));
        }
        let constraint = match constraint.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(Constraint::parse(text).map_err(|err| {
                ToolError::invocation(format!("extra '{name}': {err:#}"))
            })?),
        };
        Ok(ExtraRequirement { name, constraint })
    }
}
