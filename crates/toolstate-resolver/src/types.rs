use std::collections::BTreeMap;

use serde::Deserialize;
use toolstate_core::ToolVersion;
use tracing::debug;

/// The subset of a PyPI `/pypi/<name>/json` document this crate reads.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexDocument {
    pub info: IndexInfo,
    #[serde(default)]
    pub releases: BTreeMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexInfo {
    pub name: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseFile {
    #[serde(default)]
    pub yanked: bool,
}

impl IndexDocument {
    /// Every parseable release that still has at least one live file, or no
    /// files listed at all.
    pub fn release_versions(&self) -> Vec<ToolVersion> {
        self.releases
            .iter()
            .filter(|(_, files)| files.is_empty() || files.iter().any(|file| !file.yanked))
            .filter_map(|(raw, _)| match ToolVersion::parse(raw) {
                Ok(version) => Some(version),
                Err(err) => {
                    debug!("skipping unparseable release {raw}: {err:#}");
                    None
                }
            })
            .collect()
    }
}
