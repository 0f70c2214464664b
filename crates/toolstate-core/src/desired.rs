use std::path::PathBuf;

use crate::constraint::Constraint;
use crate::error::ToolError;
use crate::extra::ExtraRequirement;
use crate::scope::Scope;

/// What the caller wants a single tool to look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSpec {
    pub name: String,
    pub constraint: Option<Constraint>,
    pub extras: Vec<ExtraRequirement>,
    pub python: Option<PathBuf>,
    pub upgrade: bool,
    pub scope: Scope,
    pub force: bool,
    pub refresh: bool,
    pub refresh_packages: Vec<String>,
    pub reinstall_packages: Vec<String>,
    pub upgrade_packages: Vec<String>,
    pub with_requirements: Vec<PathBuf>,
}

impl DesiredSpec {
    pub fn new(name: impl Into<String>, scope: Scope) -> Result<Self, ToolError> {
        let name = name.into().trim().to_string();
        validate_tool_name(&name)?;
        Ok(Self {
            name,
            constraint: None,
            extras: Vec::new(),
            python: None,
            upgrade: false,
            scope,
            force: false,
            refresh: false,
            refresh_packages: Vec::new(),
            reinstall_packages: Vec::new(),
            upgrade_packages: Vec::new(),
            with_requirements: Vec::new(),
        })
    }

    pub fn with_constraint(mut self, constraint: Option<Constraint>) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn with_extras(mut self, extras: Vec<ExtraRequirement>) -> Self {
        self.extras = extras;
        self
    }

    pub fn with_python(mut self, python: Option<PathBuf>) -> Self {
        self.python = python;
        self
    }

    pub fn with_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }

    /// Requirements handed to the package manager, one per extra.
    pub fn flattened_extras(&self) -> Vec<String> {
        self.extras
            .iter()
            .map(ExtraRequirement::requirement)
            .collect()
    }
}

pub fn validate_tool_name(name: &str) -> Result<(), ToolError> {
    if name.is_empty() {
        return Err(ToolError::invocation("tool name must not be empty"));
    }
    if name.chars().any(|ch| ch.is_whitespace()) {
        return Err(ToolError::invocation(format!(
            "tool name must not contain whitespace: '{name}'"
        )));
    }
    if name.starts_with('-') {
        return Err(ToolError::invocation(format!(
            "tool name must not start with '-': '{name}'"
        )));
    }
    Ok(())
}
