use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::constraint::Constraint;
use crate::desired::{validate_tool_name, DesiredSpec};
use crate::error::ToolError;
use crate::extra::RawExtra;
use crate::observed::normalize_package_name;
use crate::scope::Scope;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolState {
    #[default]
    Installed,
    Latest,
    Absent,
}

impl ToolState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Latest => "latest",
            Self::Absent => "absent",
        }
    }
}

/// One `[[tool]]` entry of a state file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolEntry {
    pub name: String,
    #[serde(default)]
    pub state: ToolState,
    pub version_spec: Option<String>,
    #[serde(default)]
    pub extras: Vec<RawExtra>,
    pub python: Option<PathBuf>,
    #[serde(default)]
    pub upgrade: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub refresh: bool,
    #[serde(default)]
    pub refresh_packages: Vec<String>,
    #[serde(default)]
    pub reinstall_packages: Vec<String>,
    #[serde(default)]
    pub upgrade_packages: Vec<String>,
    #[serde(default)]
    pub with_requirements: Vec<PathBuf>,
    pub system: Option<bool>,
    pub user: Option<String>,
    /// Overrides where this tool's executables are linked.
    pub tool_bin_dir: Option<PathBuf>,
    /// Overrides where this tool's environment lives.
    pub tool_dir: Option<PathBuf>,
}

impl ToolEntry {
    pub fn scope(&self, is_superuser: bool) -> Result<Scope, ToolError> {
        Scope::resolve(self.system, self.user.as_deref(), is_superuser)
    }

    /// Normalizes the entry into the engine's input; `latest` forces upgrades.
    pub fn desired_spec(&self, scope: Scope) -> Result<DesiredSpec, ToolError> {
        let constraint = parse_optional_constraint(self.version_spec.as_deref())?;
        let extras = self
            .extras
            .iter()
            .cloned()
            .map(RawExtra::normalize)
            .collect::<Result<Vec<_>, _>>()?;

        let mut spec = DesiredSpec::new(self.name.clone(), scope)?
            .with_constraint(constraint)
            .with_extras(extras)
            .with_python(self.python.clone())
            .with_upgrade(self.upgrade || self.state == ToolState::Latest);
        spec.force = self.force;
        spec.refresh = self.refresh;
        spec.refresh_packages = self.refresh_packages.clone();
        spec.reinstall_packages = self.reinstall_packages.clone();
        spec.upgrade_packages = self.upgrade_packages.clone();
        spec.with_requirements = self.with_requirements.clone();
        Ok(spec)
    }
}

/// A declarative list of tools, applied entry by entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateFile {
    #[serde(default, rename = "tool")]
    pub tools: Vec<ToolEntry>,
}

impl StateFile {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let file: Self = toml::from_str(input).context("failed to parse toolstate state file")?;
        let mut seen = HashSet::new();
        for entry in &file.tools {
            validate_tool_name(entry.name.trim())
                .map_err(|err| anyhow!("invalid tool entry: {err}"))?;
            let key = (
                normalize_package_name(&entry.name),
                entry.system,
                entry.user.clone(),
                entry.tool_dir.clone(),
            );
            if !seen.insert(key) {
                return Err(anyhow!(
                    "duplicate tool entry '{}' for the same target",
                    entry.name
                ));
            }
            if entry.system == Some(true) && entry.user.is_some() {
                return Err(anyhow!(
                    "tool entry '{}' sets both system and user",
                    entry.name
                ));
            }
        }
        Ok(file)
    }
}

/// Empty or whitespace-only text means "no constraint".
pub fn parse_optional_constraint(raw: Option<&str>) -> Result<Option<Constraint>, ToolError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => Constraint::parse(text)
            .map(Some)
            .map_err(|err| ToolError::invocation(format!("{err:#}"))),
    }
}
