use toolstate_core::{
    parse_optional_constraint, validate_tool_name, ActionExecutor, Constraint, DesiredSpec,
    InstallRequest, ObservedTool, Observer, Scope, ToolError, ToolVersion, UpgradeAllRequest,
    UpgradeRequest, VersionResolver,
};
use tracing::info;

use crate::changes::Changes;
use crate::context::ExecutionContext;
use crate::diff::{compute_diff, Diff};
use crate::outcome::{settle, StateResult};

const ALL_TOOLS: &str = "all";

/// Drives one tool towards its declared state through the collaborators.
pub struct Engine<'a, O: ?Sized, R: ?Sized, E: ?Sized> {
    observer: &'a O,
    resolver: &'a R,
    executor: &'a E,
    context: ExecutionContext,
}

/// Installed versus newest acceptable version of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedReport {
    pub name: String,
    pub current: ToolVersion,
    pub latest: ToolVersion,
}

impl OutdatedReport {
    pub fn is_outdated(&self) -> bool {
        self.current < self.latest
    }
}

impl<'a, O, R, E> Engine<'a, O, R, E>
where
    O: Observer + ?Sized,
    R: VersionResolver + ?Sized,
    E: ActionExecutor + ?Sized,
{
    pub fn new(
        observer: &'a O,
        resolver: &'a R,
        executor: &'a E,
        context: ExecutionContext,
    ) -> Self {
        Self {
            observer,
            resolver,
            executor,
            context,
        }
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    /// Ensures the tool is installed as `spec` describes.
    pub fn installed(&self, spec: &DesiredSpec) -> Result<StateResult, ToolError> {
        settle(&spec.name, self.converge(spec))
    }

    /// `installed` with upgrades forced on.
    pub fn latest(&self, spec: &DesiredSpec) -> Result<StateResult, ToolError> {
        let spec = spec.clone().with_upgrade(true);
        self.installed(&spec)
    }

    /// Ensures the tool is not installed in `scope`.
    pub fn absent(&self, name: &str, scope: &Scope) -> Result<StateResult, ToolError> {
        validate_tool_name(name)?;
        settle(name, self.enforce_absence(name, scope))
    }

    /// Uninstalls every tool in `scope`.
    pub fn remove_all(&self, scope: &Scope) -> Result<StateResult, ToolError> {
        if self.context.dry_run {
            return Ok(StateResult::pending(
                ALL_TOOLS,
                format!("All tools would have been removed {}", scope.describe()),
                Changes::removed(ALL_TOOLS),
            ));
        }
        let outcome = self.executor.remove_all(scope).map(|()| {
            StateResult::changed(
                ALL_TOOLS,
                format!("All tools have been removed {}", scope.describe()),
                Changes::removed(ALL_TOOLS),
            )
        });
        settle(ALL_TOOLS, outcome)
    }

    /// Upgrades every tool in the request's scope within its install-time
    /// constraint.
    pub fn upgrade_all(&self, request: &UpgradeAllRequest) -> Result<StateResult, ToolError> {
        if self.context.dry_run {
            return Ok(StateResult::pending(
                ALL_TOOLS,
                format!(
                    "All tools would have been upgraded {}",
                    request.scope.describe()
                ),
                Changes::upgraded(ALL_TOOLS),
            ));
        }
        let outcome = self.executor.upgrade_all(request).map(|()| {
            StateResult::changed(
                ALL_TOOLS,
                format!("All tools have been upgraded {}", request.scope.describe()),
                Changes::upgraded(ALL_TOOLS),
            )
        });
        settle(ALL_TOOLS, outcome)
    }

    pub fn is_installed(&self, name: &str, scope: &Scope) -> Result<bool, ToolError> {
        self.observer.is_installed(name, scope)
    }

    /// Compares the installed version against the newest release allowed by
    /// `constraint`, or by the install-time constraint when none is given.
    pub fn outdated(
        &self,
        name: &str,
        scope: &Scope,
        constraint: Option<&Constraint>,
    ) -> Result<OutdatedReport, ToolError> {
        let Some(observed) = self.observer.observe(name, scope)? else {
            return Err(ToolError::invocation(format!(
                "{name} is not installed {}",
                scope.describe()
            )));
        };
        let recorded = match constraint {
            Some(_) => None,
            None => parse_optional_constraint(observed.install_spec.as_deref())?,
        };
        let latest = self
            .resolver
            .latest_version(name, constraint.or(recorded.as_ref()))?;
        Ok(OutdatedReport {
            name: observed.name,
            current: observed.version,
            latest,
        })
    }

    fn converge(&self, spec: &DesiredSpec) -> Result<StateResult, ToolError> {
        let scope = &spec.scope;
        let current = self.observer.observe(&spec.name, scope)?;
        let diff = compute_diff(spec, current.as_ref(), self.resolver)?;
        if diff.is_empty() {
            return Ok(StateResult::unchanged(
                &spec.name,
                "The tool is already installed as specified",
            ));
        }

        let verb = action_verb(current.as_ref(), &diff);
        if self.context.dry_run {
            return Ok(StateResult::pending(
                &spec.name,
                format!("The tool would have been {verb} {}", scope.describe()),
                diff.changes,
            ));
        }

        let prereleases = self.resolver.includes_prereleases();
        if diff.reinstall {
            info!("installing {} {}", spec.name, scope.describe());
            self.executor.install(&install_request(spec, prereleases))?;
        } else {
            info!("upgrading {} {}", spec.name, scope.describe());
            self.executor.upgrade(&upgrade_request(spec, prereleases))?;
        }

        let Some(after) = self.observer.observe(&spec.name, scope)? else {
            return Err(ToolError::consistency(format!(
                "There were no errors during installation, but '{}' is still not installed",
                spec.name
            )));
        };
        let pending = compute_diff(spec, Some(&after), self.resolver)?;
        if !pending.is_empty() {
            return Err(ToolError::consistency(format!(
                "Installation succeeded, but there are still pending changes: {}",
                pending.changes.to_json()
            )));
        }

        Ok(StateResult::changed(
            &spec.name,
            format!("The tool has been {verb} {}", scope.describe()),
            diff.changes,
        ))
    }

    fn enforce_absence(&self, name: &str, scope: &Scope) -> Result<StateResult, ToolError> {
        if !self.observer.is_installed(name, scope)? {
            return Ok(StateResult::unchanged(name, "The tool is already absent"));
        }
        if self.context.dry_run {
            return Ok(StateResult::pending(
                name,
                format!("The tool would have been removed {}", scope.describe()),
                Changes::removed(name),
            ));
        }

        info!("removing {name} {}", scope.describe());
        self.executor.remove(name, scope)?;
        if self.observer.is_installed(name, scope)? {
            return Err(ToolError::consistency(
                "There were no errors during uninstallation, but the tool is still reported as installed",
            ));
        }
        Ok(StateResult::changed(
            name,
            format!("The tool has been removed {}", scope.describe()),
            Changes::removed(name),
        ))
    }
}

fn action_verb(current: Option<&ObservedTool>, diff: &Diff) -> &'static str {
    match (current, diff.reinstall) {
        (None, _) => "installed",
        (Some(_), true) => "reinstalled",
        (Some(_), false) => "upgraded",
    }
}

fn install_request(spec: &DesiredSpec, prereleases: bool) -> InstallRequest {
    InstallRequest {
        name: spec.name.clone(),
        constraint: spec.constraint.clone(),
        extras: spec.flattened_extras(),
        with_requirements: spec.with_requirements.clone(),
        python: spec.python.clone(),
        scope: spec.scope.clone(),
        force: spec.force,
        refresh: spec.refresh,
        refresh_packages: spec.refresh_packages.clone(),
        reinstall: true,
        reinstall_packages: spec.reinstall_packages.clone(),
        prereleases,
    }
}

fn upgrade_request(spec: &DesiredSpec, prereleases: bool) -> UpgradeRequest {
    UpgradeRequest {
        name: spec.name.clone(),
        constraint: spec.constraint.clone(),
        python: spec.python.clone(),
        scope: spec.scope.clone(),
        upgrade: spec.upgrade,
        upgrade_packages: spec.upgrade_packages.clone(),
        prereleases,
    }
}
