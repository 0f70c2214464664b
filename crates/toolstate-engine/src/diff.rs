use std::fs;
use std::path::{self, Path, PathBuf};

use toolstate_core::{DesiredSpec, ObservedTool, ToolError, VersionResolver};
use tracing::debug;

use crate::changes::{Changes, ValueChange};

/// Differences between a tool's declared and observed configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub changes: Changes,
    /// Interpreter, constraint or extras changes need a fresh environment;
    /// a version-only change can be upgraded in place.
    pub reinstall: bool,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Compares `spec` against what is installed, asking `resolver` for target
/// versions where a mismatch needs one.
pub fn compute_diff<R>(
    spec: &DesiredSpec,
    observed: Option<&ObservedTool>,
    resolver: &R,
) -> Result<Diff, ToolError>
where
    R: VersionResolver + ?Sized,
{
    let Some(observed) = observed else {
        return Ok(Diff {
            changes: Changes::installed(&spec.name),
            reinstall: true,
        });
    };

    let mut diff = Diff::default();
    let prereleases = resolver.includes_prereleases();

    if let Some(python) = &spec.python {
        if resolve_python_path(python) != observed.python {
            diff.changes.python = Some(ValueChange::between(
                observed.python.display().to_string(),
                python.display().to_string(),
            ));
            diff.reinstall = true;
        }
    }

    for extra in &spec.extras {
        let constraint = extra.constraint.as_ref();
        let change = match observed.package_version(&extra.name) {
            None => Some(ValueChange {
                old: None,
                new: Some(resolver.latest_version(&extra.name, constraint)?.to_string()),
            }),
            Some(installed) if constraint.is_some_and(|c| !c.allows(installed, prereleases)) => {
                let latest = resolver.latest_version(&extra.name, constraint)?;
                Some(ValueChange::between(installed.to_string(), latest.to_string()))
            }
            Some(installed) if spec.upgrade => {
                let latest = resolver.latest_version(&extra.name, constraint)?;
                (installed < &latest)
                    .then(|| ValueChange::between(installed.to_string(), latest.to_string()))
            }
            Some(_) => None,
        };
        if let Some(change) = change {
            diff.changes.extras.insert(extra.name.clone(), change);
        }
    }
    if !diff.changes.extras.is_empty() {
        diff.reinstall = true;
    }

    let constraint = spec.constraint.as_ref();
    let constraint_unchanged = match (constraint, observed.install_spec.as_deref()) {
        (None, None) => true,
        (Some(desired), Some(recorded)) => desired.same_text(recorded),
        _ => false,
    };

    if !constraint_unchanged {
        diff.changes.version_spec = Some(ValueChange {
            old: observed.install_spec.clone(),
            new: constraint.map(|c| c.as_str().to_string()),
        });
        diff.reinstall = true;
        let latest = resolver.latest_version(&spec.name, constraint)?;
        if latest.cmp(&observed.version).is_ne() {
            diff.changes.version = Some(ValueChange::between(
                observed.version.to_string(),
                latest.to_string(),
            ));
        }
    } else if let Some(desired) =
        constraint.filter(|c| !c.allows(&observed.version, prereleases))
    {
        let latest = resolver.latest_version(&spec.name, Some(desired))?;
        diff.changes.version = Some(ValueChange::between(
            observed.version.to_string(),
            latest.to_string(),
        ));
        diff.reinstall = true;
    }

    if spec.upgrade && diff.changes.version.is_none() {
        let latest = resolver.latest_version(&spec.name, constraint)?;
        if observed.version < latest {
            diff.changes.version = Some(ValueChange::between(
                observed.version.to_string(),
                latest.to_string(),
            ));
        }
    }

    debug!(
        "diff for {}: {} (reinstall: {})",
        spec.name,
        diff.changes.to_json(),
        diff.reinstall
    );
    Ok(diff)
}

/// Canonical form of a declared interpreter, falling back to an absolute
/// path when it does not exist yet.
pub fn resolve_python_path(python: &Path) -> PathBuf {
    fs::canonicalize(python)
        .or_else(|_| path::absolute(python))
        .unwrap_or_else(|_| python.to_path_buf())
}
