use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::version::ToolVersion;

/// A tool as the package manager reports it right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedTool {
    pub name: String,
    pub python: PathBuf,
    pub python_version: String,
    /// The constraint the tool was installed with, verbatim.
    pub install_spec: Option<String>,
    pub version: ToolVersion,
    pub venv_path: PathBuf,
    /// Installed packages keyed by normalized name.
    #[serde(default)]
    pub packages: BTreeMap<String, ToolVersion>,
}

impl ObservedTool {
    pub fn package_version(&self, name: &str) -> Option<&ToolVersion> {
        self.packages.get(&normalize_package_name(name))
    }
}

/// Canonical package name: lowercase with runs of `-`, `_`, `.` folded to `-`.
pub fn normalize_package_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalized.is_empty() {
            normalized.push('-');
        }
        pending_separator = false;
        normalized.push(ch.to_ascii_lowercase());
    }
    normalized
}
