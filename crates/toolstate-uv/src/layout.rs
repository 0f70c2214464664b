use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use toolstate_core::Scope;

use crate::options::UvOptions;

pub const SYSTEM_TOOL_BIN_DIR: &str = "/usr/local/bin";
pub const SYSTEM_TOOL_DIR: &str = "/opt/uv/tools";

/// Where a scope's tool environments and executables live.
///
/// User scopes leave both unset so `uv` applies its per-user defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLayout {
    bin_dir: Option<PathBuf>,
    tool_dir: Option<PathBuf>,
}

impl ToolLayout {
    pub fn for_scope(scope: &Scope, options: &UvOptions) -> Self {
        let (default_bin, default_tools) = if scope.is_system() {
            (
                Some(PathBuf::from(SYSTEM_TOOL_BIN_DIR)),
                Some(PathBuf::from(SYSTEM_TOOL_DIR)),
            )
        } else {
            (None, None)
        };
        Self {
            bin_dir: options.tool_bin_dir.clone().or(default_bin),
            tool_dir: options.tool_dir.clone().or(default_tools),
        }
    }

    pub fn bin_dir(&self) -> Option<&Path> {
        self.bin_dir.as_deref()
    }

    pub fn tool_dir(&self) -> Option<&Path> {
        self.tool_dir.as_deref()
    }

    pub fn env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        if let Some(bin_dir) = &self.bin_dir {
            env.insert("UV_TOOL_BIN_DIR".to_string(), bin_dir.display().to_string());
        }
        if let Some(tool_dir) = &self.tool_dir {
            env.insert("UV_TOOL_DIR".to_string(), tool_dir.display().to_string());
        }
        env
    }
}
