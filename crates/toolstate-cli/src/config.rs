use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use toolstate_resolver::{IndexOptions, DEFAULT_INDEX_ENDPOINT};
use toolstate_uv::UvOptions;

pub const CONFIG_ENV: &str = "TOOLSTATE_CONFIG";

/// Contents of `toolstate.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub uv: UvOptions,
    pub index: IndexConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    pub endpoint: String,
    pub include_prereleases: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_INDEX_ENDPOINT.to_string(),
            include_prereleases: false,
            timeout_secs: Some(30),
        }
    }
}

impl IndexConfig {
    pub fn options(&self) -> IndexOptions {
        IndexOptions {
            endpoint: self.endpoint.clone(),
            include_prereleases: self.include_prereleases,
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Config {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("failed to parse toolstate config")
    }

    /// Reads the explicit path, else `$TOOLSTATE_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        match resolve_config_path(explicit, from_env) {
            Some(path) => {
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("failed reading config: {}", path.display()))?;
                Self::from_toml_str(&raw)
                    .with_context(|| format!("invalid config: {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }
}

pub fn resolve_config_path(explicit: Option<&Path>, from_env: Option<PathBuf>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| from_env.filter(|path| !path.as_os_str().is_empty()))
}
