use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::constraint::Constraint;
use crate::error::ToolError;
use crate::observed::{normalize_package_name, ObservedTool};
use crate::scope::Scope;
use crate::version::ToolVersion;

/// Reads installation state from the package manager.
pub trait Observer {
    fn list_tools(
        &self,
        names: Option<&[String]>,
        scope: &Scope,
    ) -> Result<BTreeMap<String, ObservedTool>, ToolError>;

    /// Finds a tool by its normalized package name, so `Copier` finds the
    /// `copier` the package manager reports.
    fn observe(&self, name: &str, scope: &Scope) -> Result<Option<ObservedTool>, ToolError> {
        let names = [name.to_string()];
        let wanted = normalize_package_name(name);
        Ok(self
            .list_tools(Some(&names), scope)?
            .into_values()
            .find(|tool| normalize_package_name(&tool.name) == wanted))
    }

    fn is_installed(&self, name: &str, scope: &Scope) -> Result<bool, ToolError> {
        Ok(self.observe(name, scope)?.is_some())
    }
}

/// Looks up the newest release of a package on its index.
pub trait VersionResolver {
    fn latest_version(
        &self,
        name: &str,
        constraint: Option<&Constraint>,
    ) -> Result<ToolVersion, ToolError>;

    /// Whether pre-releases count as candidates everywhere a constraint is
    /// checked.
    fn includes_prereleases(&self) -> bool {
        false
    }
}

/// Changes installation state.
pub trait ActionExecutor {
    fn install(&self, request: &InstallRequest) -> Result<(), ToolError>;
    fn upgrade(&self, request: &UpgradeRequest) -> Result<(), ToolError>;
    fn remove(&self, name: &str, scope: &Scope) -> Result<(), ToolError>;
    fn remove_all(&self, scope: &Scope) -> Result<(), ToolError>;
    fn upgrade_all(&self, request: &UpgradeAllRequest) -> Result<(), ToolError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub name: String,
    pub constraint: Option<Constraint>,
    /// Flattened `name<constraint>` requirements.
    pub extras: Vec<String>,
    pub with_requirements: Vec<PathBuf>,
    pub python: Option<PathBuf>,
    pub scope: Scope,
    pub force: bool,
    pub refresh: bool,
    pub refresh_packages: Vec<String>,
    pub reinstall: bool,
    pub reinstall_packages: Vec<String>,
    pub prereleases: bool,
}

impl InstallRequest {
    /// The package argument, e.g. `copier<10`.
    pub fn package_spec(&self) -> String {
        match &self.constraint {
            Some(constraint) => format!("{}{}", self.name, constraint.normalized()),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub name: String,
    /// Upper bound kept by the package manager from install time.
    pub constraint: Option<Constraint>,
    pub python: Option<PathBuf>,
    pub scope: Scope,
    pub upgrade: bool,
    pub upgrade_packages: Vec<String>,
    pub prereleases: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeAllRequest {
    pub scope: Scope,
    pub python: Option<PathBuf>,
    pub upgrade: bool,
    pub upgrade_packages: Vec<String>,
    pub prereleases: bool,
}
