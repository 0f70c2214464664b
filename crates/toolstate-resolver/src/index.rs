use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use toolstate_core::{Constraint, ToolError, ToolVersion, VersionResolver};
use tracing::info;

use crate::select::select_latest_release;
use crate::types::IndexDocument;

pub const DEFAULT_INDEX_ENDPOINT: &str = "https://pypi.org/pypi/{}/json";
const PACKAGE_MARKER: &str = "{}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// JSON endpoint with a `{}` marker for the package name.
    pub endpoint: String,
    pub include_prereleases: bool,
    pub timeout: Option<Duration>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_INDEX_ENDPOINT.to_string(),
            include_prereleases: false,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// A package index speaking the PyPI JSON API.
#[derive(Debug, Clone)]
pub struct PackageIndex {
    options: IndexOptions,
    client: Client,
}

impl PackageIndex {
    pub fn new(options: IndexOptions) -> Result<Self> {
        if !options.endpoint.contains(PACKAGE_MARKER) {
            bail!(
                "index endpoint must contain a '{PACKAGE_MARKER}' package marker: {}",
                options.endpoint
            );
        }

        let mut builder =
            Client::builder().user_agent(concat!("toolstate/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .context("failed to build package index HTTP client")?;
        Ok(Self { options, client })
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    pub fn document_url(&self, name: &str) -> String {
        self.options.endpoint.replace(PACKAGE_MARKER, name)
    }

    pub fn fetch_document(&self, name: &str) -> Result<IndexDocument> {
        let url = self.document_url(name);
        info!("looking up versions for {name} at {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("failed querying package index at {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("package index returned {status} for {url}");
        }
        let body = response
            .text()
            .with_context(|| format!("failed reading package index response from {url}"))?;
        serde_json::from_str(&body)
            .with_context(|| format!("failed parsing package index response from {url}"))
    }
}

impl VersionResolver for PackageIndex {
    fn latest_version(
        &self,
        name: &str,
        constraint: Option<&Constraint>,
    ) -> Result<ToolVersion, ToolError> {
        let document = self.fetch_document(name).map_err(ToolError::command)?;
        let latest = resolve_latest(
            name,
            &document,
            constraint,
            self.options.include_prereleases,
        )?;
        info!("latest version of {name}: {latest}");
        Ok(latest)
    }

    fn includes_prereleases(&self) -> bool {
        self.options.include_prereleases
    }
}

/// Applies release filtering to an already fetched index document.
///
/// Without a constraint and without pre-releases the index's own notion of
/// the current version wins.
pub fn resolve_latest(
    name: &str,
    document: &IndexDocument,
    constraint: Option<&Constraint>,
    include_prereleases: bool,
) -> Result<ToolVersion, ToolError> {
    if constraint.is_none() && !include_prereleases {
        return ToolVersion::parse(&document.info.version).map_err(|err| {
            ToolError::command(err.context(format!("index reported an invalid version for {name}")))
        });
    }

    let versions = document.release_versions();
    select_latest_release(&versions, constraint, include_prereleases)
        .cloned()
        .ok_or_else(|| ToolError::NoMatchingVersion {
            name: name.to_string(),
            constraint: constraint
                .map(ToString::to_string)
                .unwrap_or_else(|| "*".to_string()),
        })
}
