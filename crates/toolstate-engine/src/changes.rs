use std::collections::BTreeMap;

use serde::Serialize;

/// An `{old, new}` pair; either side may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueChange {
    pub old: Option<String>,
    pub new: Option<String>,
}

impl ValueChange {
    pub fn between(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: Some(old.into()),
            new: Some(new.into()),
        }
    }
}

/// Changes made or pending for one operation, keyed by category.
///
/// Serializes to a JSON object holding only the categories that are set, so
/// an empty set renders as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<ValueChange>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, ValueChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_spec: Option<ValueChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<ValueChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgraded: Option<String>,
}

impl Changes {
    pub fn installed(name: impl Into<String>) -> Self {
        Self {
            installed: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn removed(name: impl Into<String>) -> Self {
        Self {
            removed: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn upgraded(name: impl Into<String>) -> Self {
        Self {
            upgraded: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
