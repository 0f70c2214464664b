use super::*;

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

use anyhow::anyhow;
use toolstate_core::{
    ActionExecutor, Constraint, DesiredSpec, ExtraRequirement, InstallRequest, ObservedTool,
    normalize_package_name, Observer, Scope, ToolError, ToolVersion, UpgradeAllRequest,
    UpgradeRequest, VersionResolver,
};

const PYTHON: &str = "/nonexistent/tools/copier/bin/python3.12";

fn version(raw: &str) -> ToolVersion {
    ToolVersion::parse(raw).expect("must parse version")
}

fn constraint(raw: &str) -> Constraint {
    Constraint::parse(raw).expect("must parse constraint")
}

fn observed(name: &str, installed: &str, install_spec: Option<&str>) -> ObservedTool {
    ObservedTool {
        name: name.to_string(),
        python: PathBuf::from(PYTHON),
        python_version: "3.12.4".to_string(),
        install_spec: install_spec.map(ToString::to_string),
        version: version(installed),
        venv_path: PathBuf::from(format!("/nonexistent/tools/{name}")),
        packages: BTreeMap::from([(name.to_string(), version(installed))]),
    }
}

fn with_package(mut tool: ObservedTool, name: &str, installed: &str) -> ObservedTool {
    tool.packages.insert(name.to_string(), version(installed));
    tool
}

fn spec(name: &str) -> DesiredSpec {
    DesiredSpec::new(name, Scope::System).expect("must build spec")
}

/// Replays scripted observations; the last one repeats once the script runs
/// out.
#[derive(Default)]
struct FakeObserver {
    script: RefCell<VecDeque<Option<ObservedTool>>>,
    calls: RefCell<usize>,
}

impl FakeObserver {
    fn new(script: Vec<Option<ObservedTool>>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            calls: RefCell::new(0),
        }
    }
}

impl Observer for FakeObserver {
    fn list_tools(
        &self,
        names: Option<&[String]>,
        _scope: &Scope,
    ) -> Result<BTreeMap<String, ObservedTool>, ToolError> {
        *self.calls.borrow_mut() += 1;
        let mut script = self.script.borrow_mut();
        let next = if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().cloned().flatten()
        };
        Ok(next
            .into_iter()
            .filter(|tool| {
                let key = normalize_package_name(&tool.name);
                names.is_none_or(|names| {
                    names.iter().any(|name| normalize_package_name(name) == key)
                })
            })
            .map(|tool| (tool.name.clone(), tool))
            .collect())
    }
}

struct FakeResolver {
    releases: BTreeMap<String, Vec<ToolVersion>>,
    prereleases: bool,
}

impl FakeResolver {
    fn new(releases: &[(&str, &[&str])]) -> Self {
        Self {
            releases: releases
                .iter()
                .map(|(name, versions)| {
                    (
                        name.to_string(),
                        versions.iter().map(|raw| version(raw)).collect(),
                    )
                })
                .collect(),
            prereleases: false,
        }
    }

    fn with_prereleases(mut self) -> Self {
        self.prereleases = true;
        self
    }
}

impl VersionResolver for FakeResolver {
    fn latest_version(
        &self,
        name: &str,
        constraint: Option<&Constraint>,
    ) -> Result<ToolVersion, ToolError> {
        self.releases
            .get(name)
            .into_iter()
            .flatten()
            .filter(|candidate| !candidate.is_postrelease())
            .filter(|candidate| self.prereleases || candidate.is_stable())
            .filter(|candidate| constraint.is_none_or(|c| c.allows(candidate, self.prereleases)))
            .max()
            .cloned()
            .ok_or_else(|| ToolError::NoMatchingVersion {
                name: name.to_string(),
                constraint: constraint.map_or("*".to_string(), |c| c.as_str().to_string()),
            })
    }
}

#[derive(Default)]
struct FakeExecutor {
    calls: RefCell<Vec<String>>,
    installs: RefCell<Vec<InstallRequest>>,
    upgrades: RefCell<Vec<UpgradeRequest>>,
    failure: Option<String>,
}

impl FakeExecutor {
    fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    fn record(&self, call: String) -> Result<(), ToolError> {
        self.calls.borrow_mut().push(call);
        match &self.failure {
            Some(message) => Err(ToolError::command(anyhow!("{message}"))),
            None => Ok(()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ActionExecutor for FakeExecutor {
    fn install(&self, request: &InstallRequest) -> Result<(), ToolError> {
        self.installs.borrow_mut().push(request.clone());
        self.record(format!("install {}", request.package_spec()))
    }

    fn upgrade(&self, request: &UpgradeRequest) -> Result<(), ToolError> {
        self.upgrades.borrow_mut().push(request.clone());
        self.record(format!("upgrade {}", request.name))
    }

    fn remove(&self, name: &str, scope: &Scope) -> Result<(), ToolError> {
        self.record(format!("remove {name} {scope}"))
    }

    fn remove_all(&self, scope: &Scope) -> Result<(), ToolError> {
        self.record(format!("remove-all {scope}"))
    }

    fn upgrade_all(&self, request: &UpgradeAllRequest) -> Result<(), ToolError> {
        self.record(format!("upgrade-all {}", request.scope))
    }
}

fn upgrade_all_request(scope: Scope) -> UpgradeAllRequest {
    UpgradeAllRequest {
        scope,
        python: None,
        upgrade: true,
        upgrade_packages: Vec::new(),
        prereleases: false,
    }
}

fn copier_releases() -> FakeResolver {
    FakeResolver::new(&[
        ("copier", &["1.0.0", "1.2.0", "9.5.0", "10.2.0", "11.0.0rc1"]),
        ("jinja2-time", &["0.1.0", "0.2.0"]),
    ])
}

#[test]
fn missing_tool_diff_is_installed_marker_only() {
    let diff = compute_diff(&spec("copier"), None, &copier_releases()).expect("must diff");
    assert!(diff.reinstall);
    assert_eq!(diff.changes, Changes::installed("copier"));
}

#[test]
fn matching_tool_has_empty_diff() {
    let tool = observed("copier", "1.0.0", None);
    let desired = spec("copier").with_python(Some(PathBuf::from(PYTHON)));
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.is_empty());
    assert!(!diff.reinstall);
}

#[test]
fn constraint_text_compares_without_whitespace() {
    let tool = observed("copier", "9.5.0", Some(">=2.0, <10"));
    let desired = spec("copier").with_constraint(Some(constraint(">=2.0,<10")));
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.is_empty());
}

#[test]
fn interpreter_change_forces_reinstall() {
    let tool = observed("copier", "1.0.0", None);
    let desired = spec("copier").with_python(Some(PathBuf::from("/nonexistent/python3.11")));
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.reinstall);
    assert_eq!(
        diff.changes.python,
        Some(ValueChange::between(PYTHON, "/nonexistent/python3.11"))
    );
}

#[test]
fn new_constraint_records_spec_and_version_changes() {
    let tool = observed("copier", "10.2.0", None);
    let desired = spec("copier").with_constraint(Some(constraint("<10")));
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.reinstall);
    assert_eq!(
        diff.changes.version_spec,
        Some(ValueChange {
            old: None,
            new: Some("<10".to_string())
        })
    );
    assert_eq!(
        diff.changes.version,
        Some(ValueChange::between("10.2.0", "9.5.0"))
    );
}

#[test]
fn dropped_constraint_keeps_version_when_already_latest() {
    let tool = observed("copier", "10.2.0", Some("<11"));
    let diff = compute_diff(&spec("copier"), Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.reinstall);
    assert!(diff.changes.version_spec.is_some());
    assert!(diff.changes.version.is_none());
}

#[test]
fn unsatisfied_constraint_with_same_text_forces_reinstall() {
    let tool = observed("copier", "10.2.0", Some("<10"));
    let desired = spec("copier").with_constraint(Some(constraint("<10")));
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.reinstall);
    assert!(diff.changes.version_spec.is_none());
    assert_eq!(
        diff.changes.version,
        Some(ValueChange::between("10.2.0", "9.5.0"))
    );
}

#[test]
fn upgrade_only_records_version_without_reinstall() {
    let tool = observed("copier", "1.0.0", None);
    let desired = spec("copier").with_upgrade(true);
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(!diff.reinstall);
    assert_eq!(
        diff.changes,
        Changes {
            version: Some(ValueChange::between("1.0.0", "10.2.0")),
            ..Changes::default()
        }
    );
}

#[test]
fn upgrade_respects_declared_constraint() {
    let tool = observed("copier", "9.5.0", Some("<10"));
    let desired = spec("copier")
        .with_constraint(Some(constraint("<10")))
        .with_upgrade(true);
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.is_empty());
}

#[test]
fn missing_extra_is_recorded_with_latest_satisfying() {
    let tool = observed("copier", "1.0.0", None);
    let desired = spec("copier").with_extras(vec![ExtraRequirement::new(
        "jinja2-time",
        Some(constraint("<0.2")),
    )]);
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.reinstall);
    assert_eq!(
        diff.changes.extras.get("jinja2-time"),
        Some(&ValueChange {
            old: None,
            new: Some("0.1.0".to_string())
        })
    );
}

#[test]
fn extra_constraint_downgrade_forces_reinstall_without_upgrade() {
    let tool = with_package(observed("copier", "1.0.0", None), "jinja2-time", "0.2.0");
    let desired = spec("copier").with_extras(vec![ExtraRequirement::new(
        "Jinja2_Time",
        Some(constraint("<0.2")),
    )]);
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.reinstall);
    assert_eq!(
        diff.changes.extras.get("Jinja2_Time"),
        Some(&ValueChange::between("0.2.0", "0.1.0"))
    );
}

#[test]
fn satisfied_extra_only_changes_on_upgrade() {
    let tool = with_package(observed("copier", "10.2.0", None), "jinja2-time", "0.1.0");
    let extras = vec![ExtraRequirement::new("jinja2-time", None)];
    let desired = spec("copier").with_extras(extras.clone());
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.is_empty());

    let desired = spec("copier").with_extras(extras).with_upgrade(true);
    let diff = compute_diff(&desired, Some(&tool), &copier_releases()).expect("must diff");
    assert!(diff.reinstall);
    assert_eq!(
        diff.changes.extras.get("jinja2-time"),
        Some(&ValueChange::between("0.1.0", "0.2.0"))
    );
}

#[test]
fn installed_is_noop_when_already_as_specified() {
    let observer = FakeObserver::new(vec![Some(observed("copier", "1.0.0", None))]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    for _ in 0..2 {
        let result = engine.installed(&spec("copier")).expect("must converge");
        assert_eq!(result.result, Some(true));
        assert!(result.comment.contains("already installed as specified"));
        assert!(result.changes.is_empty());
    }
    assert!(executor.calls().is_empty());
}

#[test]
fn installed_installs_missing_tool_and_verifies() {
    let observer = FakeObserver::new(vec![None, Some(observed("copier", "10.2.0", None))]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let result = engine.installed(&spec("copier")).expect("must converge");
    assert_eq!(result.result, Some(true));
    assert_eq!(result.comment, "The tool has been installed globally");
    assert_eq!(result.changes, Changes::installed("copier"));
    assert_eq!(executor.calls(), vec!["install copier"]);
    assert!(executor.installs.borrow()[0].reinstall);
    assert_eq!(*observer.calls.borrow(), 2);
}

#[test]
fn installed_reinstalls_on_new_constraint() {
    let observer = FakeObserver::new(vec![
        Some(observed("copier", "10.2.0", None)),
        Some(observed("copier", "9.5.0", Some("<10"))),
    ]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let desired = DesiredSpec::new("copier", Scope::User(Some("alice".to_string())))
        .expect("must build spec")
        .with_constraint(Some(constraint("<10")));
    let result = engine.installed(&desired).expect("must converge");
    assert_eq!(result.result, Some(true));
    assert_eq!(result.comment, "The tool has been reinstalled for user alice");
    assert_eq!(executor.calls(), vec!["install copier<10"]);
    let install = &executor.installs.borrow()[0];
    assert!(install.reinstall);
    assert_eq!(install.scope, Scope::User(Some("alice".to_string())));
}

#[test]
fn latest_dispatches_upgrade_for_version_only_change() {
    let observer = FakeObserver::new(vec![
        Some(observed("copier", "1.0.0", None)),
        Some(observed("copier", "10.2.0", None)),
    ]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let result = engine.latest(&spec("copier")).expect("must converge");
    assert_eq!(result.result, Some(true));
    assert_eq!(result.comment, "The tool has been upgraded globally");
    assert_eq!(executor.calls(), vec!["upgrade copier"]);
    assert!(executor.upgrades.borrow()[0].upgrade);
    assert!(executor.installs.borrow().is_empty());
}

#[test]
fn dry_run_reports_pending_changes_without_acting() {
    let observer = FakeObserver::new(vec![None]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::new(true, false));

    let result = engine.installed(&spec("copier")).expect("must converge");
    assert!(result.is_pending());
    assert_eq!(result.comment, "The tool would have been installed globally");
    assert_eq!(result.changes, Changes::installed("copier"));
    assert!(executor.calls().is_empty());

    let result = engine
        .absent("copier", &Scope::System)
        .expect("must converge");
    assert_eq!(result.comment, "The tool is already absent");

    engine
        .remove_all(&Scope::User(None))
        .expect("must converge");
    assert!(executor.calls().is_empty());
}

#[test]
fn dry_run_never_reinstalls_an_installed_tool() {
    let installed = with_package(observed("copier", "10.2.0", None), "jinja2-time", "0.2.0");
    let cases = [
        spec("copier").with_python(Some(PathBuf::from("/nonexistent/python3.11"))),
        spec("copier").with_extras(vec![ExtraRequirement::new(
            "jinja2-time",
            Some(constraint("<0.2")),
        )]),
        spec("copier").with_constraint(Some(constraint("<10"))),
    ];

    for desired in cases {
        let observer = FakeObserver::new(vec![Some(installed.clone())]);
        let resolver = copier_releases();
        let executor = FakeExecutor::default();
        let engine =
            Engine::new(&observer, &resolver, &executor, ExecutionContext::new(true, true));

        let result = engine.installed(&desired).expect("must converge");
        assert_eq!(result.result, None);
        assert_eq!(result.comment, "The tool would have been reinstalled globally");
        assert!(!result.changes.is_empty());
        assert!(executor.calls().is_empty());
        assert_eq!(*observer.calls.borrow(), 1);
    }
}

#[test]
fn dry_run_never_upgrades_an_outdated_tool() {
    let observer = FakeObserver::new(vec![Some(observed("copier", "1.0.0", None))]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::new(true, false));

    let result = engine.latest(&spec("copier")).expect("must converge");
    assert_eq!(result.result, None);
    assert_eq!(result.comment, "The tool would have been upgraded globally");
    assert_eq!(
        result.changes.version,
        Some(ValueChange::between("1.0.0", "10.2.0"))
    );
    assert!(executor.calls().is_empty());
}

#[test]
fn dry_run_upgrade_all_is_pending() {
    let observer = FakeObserver::new(vec![None]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::new(true, false));

    let result = engine
        .upgrade_all(&upgrade_all_request(Scope::User(None)))
        .expect("must settle");
    assert_eq!(result.result, None);
    assert_eq!(
        result.comment,
        "All tools would have been upgraded for the current user"
    );
    assert_eq!(result.changes, Changes::upgraded("all"));
    assert!(executor.calls().is_empty());
}

#[test]
fn installed_prerelease_satisfies_constraint_when_prereleases_are_enabled() {
    let observer = FakeObserver::new(vec![Some(observed("copier", "11.0.0rc1", Some(">=1.0")))]);
    let resolver = copier_releases().with_prereleases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let desired = spec("copier").with_constraint(Some(constraint(">=1.0")));
    let diff = compute_diff(
        &desired,
        observer.observe("copier", &Scope::System).expect("must observe").as_ref(),
        &resolver,
    )
    .expect("must diff");
    assert!(diff.is_empty());

    let result = engine.latest(&desired).expect("must converge");
    assert_eq!(result.result, Some(true));
    assert!(result.changes.is_empty());
    assert!(executor.calls().is_empty());
}

#[test]
fn prerelease_setting_reaches_install_requests() {
    let observer = FakeObserver::new(vec![None, Some(observed("copier", "11.0.0rc1", None))]);
    let resolver = copier_releases().with_prereleases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let result = engine.installed(&spec("copier")).expect("must converge");
    assert_eq!(result.result, Some(true));
    assert!(executor.installs.borrow()[0].prereleases);
}

#[test]
fn tool_names_match_regardless_of_spelling() {
    let observer = FakeObserver::new(vec![None, Some(observed("copier", "10.2.0", None))]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let result = engine.installed(&spec("Copier")).expect("must converge");
    assert_eq!(result.result, Some(true));
    assert_eq!(result.comment, "The tool has been installed globally");

    let result = engine.installed(&spec("Copier")).expect("must converge");
    assert_eq!(result.comment, "The tool is already installed as specified");
    assert_eq!(executor.calls(), vec!["install Copier"]);
}

#[test]
fn install_request_carries_reinstall_packages() {
    let observer = FakeObserver::new(vec![None, Some(observed("copier", "10.2.0", None))]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let mut desired = spec("copier");
    desired.reinstall_packages = vec!["jinja2".to_string()];
    engine.installed(&desired).expect("must converge");
    let install = &executor.installs.borrow()[0];
    assert_eq!(install.reinstall_packages, vec!["jinja2"]);
    assert!(!install.prereleases);
}

#[test]
fn still_missing_after_install_is_a_failed_result() {
    let observer = FakeObserver::new(vec![None]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let result = engine.installed(&spec("copier")).expect("must settle");
    assert!(result.is_failure());
    assert_eq!(
        result.comment,
        "There were no errors during installation, but 'copier' is still not installed"
    );
}

#[test]
fn pending_changes_after_install_are_a_failed_result() {
    let observer = FakeObserver::new(vec![None, Some(observed("copier", "10.2.0", None))]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let desired = spec("copier").with_constraint(Some(constraint("<10")));
    let result = engine.installed(&desired).expect("must settle");
    assert!(result.is_failure());
    assert!(result
        .comment
        .starts_with("Installation succeeded, but there are still pending changes: {"));
    assert!(result.comment.contains("\"version_spec\""));
}

#[test]
fn executor_failure_is_a_failed_result() {
    let observer = FakeObserver::new(vec![None]);
    let resolver = copier_releases();
    let executor = FakeExecutor::failing("Failed running 'uv tool install copier': boom");
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let result = engine.installed(&spec("copier")).expect("must settle");
    assert!(result.is_failure());
    assert_eq!(result.comment, "Failed running 'uv tool install copier': boom");
    assert!(result.changes.is_empty());
}

#[test]
fn unsatisfiable_constraint_is_an_invocation_error() {
    let observer = FakeObserver::new(vec![Some(observed("copier", "1.0.0", None))]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let desired = spec("copier").with_constraint(Some(constraint(">=20")));
    let err = engine.installed(&desired).expect_err("must fail");
    assert!(matches!(err, ToolError::NoMatchingVersion { .. }));
    assert!(executor.calls().is_empty());
}

#[test]
fn absent_is_noop_for_missing_tool() {
    let observer = FakeObserver::new(vec![None]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let result = engine.absent("copier", &Scope::System).expect("must settle");
    assert_eq!(result.result, Some(true));
    assert_eq!(result.comment, "The tool is already absent");
    assert!(executor.calls().is_empty());
}

#[test]
fn absent_removes_installed_tool() {
    let observer = FakeObserver::new(vec![Some(observed("copier", "1.0.0", None)), None]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let result = engine
        .absent("copier", &Scope::User(None))
        .expect("must settle");
    assert_eq!(result.result, Some(true));
    assert_eq!(result.comment, "The tool has been removed for the current user");
    assert_eq!(result.changes, Changes::removed("copier"));
    assert_eq!(executor.calls(), vec!["remove copier user"]);
}

#[test]
fn absent_dry_run_reports_pending_removal() {
    let observer = FakeObserver::new(vec![Some(observed("copier", "1.0.0", None))]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::new(true, true));

    let result = engine.absent("copier", &Scope::System).expect("must settle");
    assert!(result.is_pending());
    assert_eq!(result.changes, Changes::removed("copier"));
    assert!(executor.calls().is_empty());
}

#[test]
fn absent_fails_when_tool_survives_removal() {
    let observer = FakeObserver::new(vec![Some(observed("copier", "1.0.0", None))]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let result = engine.absent("copier", &Scope::System).expect("must settle");
    assert!(result.is_failure());
    assert!(result.comment.contains("still reported as installed"));
}

#[test]
fn absent_rejects_invalid_name() {
    let observer = FakeObserver::new(vec![None]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let err = engine.absent(" ", &Scope::System).expect_err("must reject");
    assert!(err.is_invocation());
}

#[test]
fn bulk_actions_report_results() {
    let observer = FakeObserver::new(vec![None]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let removed = engine.remove_all(&Scope::System).expect("must settle");
    assert_eq!(removed.comment, "All tools have been removed globally");
    let upgraded = engine
        .upgrade_all(&upgrade_all_request(Scope::System))
        .expect("must settle");
    assert_eq!(upgraded.result, Some(true));
    assert_eq!(executor.calls(), vec!["remove-all system", "upgrade-all system"]);
}

#[test]
fn bulk_action_failure_is_a_failed_result() {
    let observer = FakeObserver::new(vec![None]);
    let resolver = copier_releases();
    let executor = FakeExecutor::failing("boom");
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let result = engine.remove_all(&Scope::System).expect("must settle");
    assert!(result.is_failure());
    assert_eq!(result.comment, "boom");
}

#[test]
fn outdated_defaults_to_install_time_constraint() {
    let observer = FakeObserver::new(vec![Some(observed("copier", "1.2.0", Some("<10")))]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let report = engine
        .outdated("copier", &Scope::System, None)
        .expect("must report");
    assert!(report.is_outdated());
    assert_eq!(report.latest, version("9.5.0"));

    let report = engine
        .outdated("copier", &Scope::System, Some(&constraint("<1.2")))
        .expect("must report");
    assert!(!report.is_outdated());
}

#[test]
fn outdated_requires_installed_tool() {
    let observer = FakeObserver::new(vec![None]);
    let resolver = copier_releases();
    let executor = FakeExecutor::default();
    let engine = Engine::new(&observer, &resolver, &executor, ExecutionContext::default());

    let err = engine
        .outdated("copier", &Scope::System, None)
        .expect_err("must fail");
    assert!(err.is_invocation());
}

#[test]
fn state_result_serializes_expected_shape() {
    let result = StateResult::changed(
        "copier",
        "The tool has been upgraded globally",
        Changes {
            version: Some(ValueChange::between("1.0.0", "1.2.0")),
            ..Changes::default()
        },
    );
    let json = serde_json::to_value(&result).expect("must serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "name": "copier",
            "result": true,
            "comment": "The tool has been upgraded globally",
            "changes": {"version": {"old": "1.0.0", "new": "1.2.0"}},
        })
    );

    let pending = serde_json::to_value(StateResult::pending("copier", "x", Changes::default()))
        .expect("must serialize");
    assert_eq!(pending["result"], serde_json::Value::Null);
    assert_eq!(pending["changes"], serde_json::json!({}));
}
