use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use toolstate_core::{normalize_package_name, ToolVersion};
use tracing::{error, warn};

const NO_TOOLS_MARKER: &str = "No tools installed";
const REQUIRED_PREFIX: &str = "[required: ";

/// One tool line of `uv tool list --show-paths --show-version-specifiers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolListEntry {
    pub name: String,
    pub version: ToolVersion,
    pub install_spec: Option<String>,
    pub venv_path: PathBuf,
}

pub fn parse_tool_list_output(output: &str) -> Vec<ToolListEntry> {
    if output.contains(NO_TOOLS_MARKER) {
        return Vec::new();
    }

    let mut entries = Vec::new();
    for line in output.lines() {
        if line.trim().is_empty() || line.starts_with('-') {
            continue;
        }
        match parse_tool_list_line(line) {
            Some(entry) => entries.push(entry),
            None => error!("failed parsing uv output: {line}"),
        }
    }
    entries
}

/// Parses `<tool> v<version> [required: <spec>] (<venv>)`.
pub fn parse_tool_list_line(line: &str) -> Option<ToolListEntry> {
    let line = line.trim_end();
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let (name, rest) = line.split_once(char::is_whitespace)?;
    let (version, rest) = rest.trim_start().split_once(char::is_whitespace)?;
    let version = ToolVersion::parse(version.strip_prefix('v').unwrap_or(version)).ok()?;

    let mut rest = rest.trim_start();
    let mut install_spec = None;
    if let Some(after) = rest.strip_prefix(REQUIRED_PREFIX) {
        let (spec, after) = after.split_once(']')?;
        install_spec = Some(spec.trim().to_string()).filter(|spec| !spec.is_empty());
        rest = after.trim_start();
    }

    let venv = rest.strip_prefix('(')?.strip_suffix(')')?;
    if venv.is_empty() {
        return None;
    }

    Some(ToolListEntry {
        name: name.to_string(),
        version,
        install_spec,
        venv_path: PathBuf::from(venv),
    })
}

#[derive(Debug, Deserialize)]
struct PipPackage {
    name: String,
    version: String,
}

/// Parses `uv pip list --format json` into normalized name -> version.
pub fn parse_pip_list_json(output: &str) -> Result<BTreeMap<String, ToolVersion>> {
    let packages: Vec<PipPackage> =
        serde_json::from_str(output.trim()).context("failed parsing uv pip list output")?;
    let mut parsed = BTreeMap::new();
    for package in packages {
        match ToolVersion::parse(&package.version) {
            Ok(version) => {
                parsed.insert(normalize_package_name(&package.name), version);
            }
            Err(err) => warn!(
                "ignoring package {} with unparseable version {}: {err:#}",
                package.name, package.version
            ),
        }
    }
    Ok(parsed)
}

/// `Python 3.12.1` -> `3.12.1`.
pub fn parse_python_version(output: &str) -> String {
    output
        .trim()
        .rsplit(' ')
        .next()
        .unwrap_or_default()
        .to_string()
}
