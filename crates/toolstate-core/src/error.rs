use thiserror::Error;

/// Failures crossing the collaborator seam.
///
/// `Invocation` and `NoMatchingVersion` mean the caller asked for something
/// that cannot be done and are surfaced as errors. `Command` and
/// `Consistency` are folded into a failed result record by the operation that
/// hit them.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Invocation(String),

    #[error("no release of '{name}' satisfies '{constraint}'")]
    NoMatchingVersion { name: String, constraint: String },

    #[error("{0}")]
    Command(String),

    #[error("{0}")]
    Consistency(String),
}

impl ToolError {
    pub fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation(message.into())
    }

    /// Wraps an adapter failure, keeping the whole context chain in the text.
    pub fn command(err: anyhow::Error) -> Self {
        Self::Command(format!("{err:#}"))
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }

    pub fn is_invocation(&self) -> bool {
        matches!(self, Self::Invocation(_) | Self::NoMatchingVersion { .. })
    }
}
