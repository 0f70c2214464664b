use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Which tool set an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "user")]
pub enum Scope {
    /// The shared, system-wide tool set.
    System,
    /// A user's own tools; `None` is the invoking user.
    User(Option<String>),
}

impl Scope {
    /// Decides the target once per invocation.
    ///
    /// An explicit `system` flag wins; an explicit user selects that user;
    /// with neither, a superuser caller gets the system tool set.
    pub fn resolve(
        system: Option<bool>,
        user: Option<&str>,
        is_superuser: bool,
    ) -> Result<Self, ToolError> {
        let user = user.map(str::trim).filter(|value| !value.is_empty());
        match (system, user) {
            (Some(true), Some(user)) => Err(ToolError::invocation(format!(
                "system scope and user '{user}' are mutually exclusive"
            ))),
            (Some(true), None) => Ok(Self::System),
            (_, Some(user)) => Ok(Self::User(Some(user.to_string()))),
            (None, None) if is_superuser => Ok(Self::System),
            (_, None) => Ok(Self::User(None)),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }

    /// The account commands must run as, when it differs from the caller.
    pub fn run_as(&self) -> Option<&str> {
        match self {
            Self::System => None,
            Self::User(user) => user.as_deref(),
        }
    }

    /// Trailing phrase for result comments ("installed globally").
    pub fn describe(&self) -> String {
        match self {
            Self::System => "globally".to_string(),
            Self::User(Some(user)) => format!("for user {user}"),
            Self::User(None) => "for the current user".to_string(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::User(Some(user)) => write!(f, "user:{user}"),
            Self::User(None) => f.write_str("user"),
        }
    }
}
