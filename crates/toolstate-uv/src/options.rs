use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PythonPreference {
    OnlyManaged,
    Managed,
    System,
    OnlySystem,
}

impl PythonPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnlyManaged => "only-managed",
            Self::Managed => "managed",
            Self::System => "system",
            Self::OnlySystem => "only-system",
        }
    }
}

/// Flags and environment shared by every `uv` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UvOptions {
    /// The `uv` executable; looked up on `PATH` when unset.
    pub uv_path: Option<PathBuf>,
    /// Used to run commands as another user; defaults to `sudo`.
    pub sudo_path: Option<PathBuf>,
    pub native_tls: bool,
    pub offline: bool,
    pub no_cache: bool,
    pub no_config: bool,
    pub no_python_downloads: bool,
    pub cache_dir: Option<PathBuf>,
    pub directory: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub python_preference: Option<PythonPreference>,
    pub env: BTreeMap<String, String>,
    /// Overrides `UV_TOOL_BIN_DIR` for every scope.
    pub tool_bin_dir: Option<PathBuf>,
    /// Overrides `UV_TOOL_DIR` for every scope.
    pub tool_dir: Option<PathBuf>,
}

impl UvOptions {
    /// Replaces the tool directories where an override is given.
    pub fn with_tool_dirs(
        mut self,
        tool_bin_dir: Option<PathBuf>,
        tool_dir: Option<PathBuf>,
    ) -> Self {
        if tool_bin_dir.is_some() {
            self.tool_bin_dir = tool_bin_dir;
        }
        if tool_dir.is_some() {
            self.tool_dir = tool_dir;
        }
        self
    }

    pub fn program(&self) -> PathBuf {
        self.uv_path.clone().unwrap_or_else(|| PathBuf::from("uv"))
    }

    /// Global flags appended after the subcommand's own options.
    pub fn global_args(&self) -> Vec<String> {
        self.global_args_with_directory(self.directory.as_deref())
    }

    pub fn global_args_with_directory(&self, directory: Option<&Path>) -> Vec<String> {
        let mut args = Vec::new();
        for (flag, enabled) in [
            ("--no-cache", self.no_cache),
            ("--no-config", self.no_config),
            ("--native-tls", self.native_tls),
            ("--offline", self.offline),
            ("--no-python-downloads", self.no_python_downloads),
        ] {
            if enabled {
                args.push(flag.to_string());
            }
        }

        let valued = [
            ("--cache-dir", self.cache_dir.as_deref().map(path_arg)),
            ("--directory", directory.map(path_arg)),
            ("--project", self.project.as_deref().map(path_arg)),
            ("--config-file", self.config_file.as_deref().map(path_arg)),
            (
                "--python-preference",
                self.python_preference.map(|pref| pref.as_str().to_string()),
            ),
        ];
        for (flag, value) in valued {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value);
            }
        }
        args
    }
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.display().to_string()
}
