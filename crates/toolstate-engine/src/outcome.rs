use serde::Serialize;
use toolstate_core::ToolError;
use tracing::warn;

use crate::changes::Changes;

/// The record every operation reports back to its host.
///
/// `result` is `Some(true)` on success, `Some(false)` on failure and `None`
/// when a dry run found work to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateResult {
    pub name: String,
    pub result: Option<bool>,
    pub comment: String,
    pub changes: Changes,
}

impl StateResult {
    pub fn unchanged(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self::with_result(name, Some(true), comment, Changes::default())
    }

    pub fn changed(name: impl Into<String>, comment: impl Into<String>, changes: Changes) -> Self {
        Self::with_result(name, Some(true), comment, changes)
    }

    pub fn pending(name: impl Into<String>, comment: impl Into<String>, changes: Changes) -> Self {
        Self::with_result(name, None, comment, changes)
    }

    pub fn failed(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self::with_result(name, Some(false), comment, Changes::default())
    }

    fn with_result(
        name: impl Into<String>,
        result: Option<bool>,
        comment: impl Into<String>,
        changes: Changes,
    ) -> Self {
        Self {
            name: name.into(),
            result,
            comment: comment.into(),
            changes,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.result == Some(false)
    }

    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}

/// Operation boundary: command and consistency failures become a failed
/// record, invocation errors propagate to the caller.
pub(crate) fn settle(
    name: &str,
    outcome: Result<StateResult, ToolError>,
) -> Result<StateResult, ToolError> {
    match outcome {
        Ok(result) => Ok(result),
        Err(err) if err.is_invocation() => Err(err),
        Err(err @ ToolError::Consistency(_)) => {
            warn!("{name}: {err}");
            Ok(StateResult::failed(name, err.to_string()))
        }
        Err(err) => Ok(StateResult::failed(name, err.to_string())),
    }
}
