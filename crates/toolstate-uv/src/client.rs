use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use toolstate_core::{
    normalize_package_name, ActionExecutor, InstallRequest, ObservedTool, Observer, Scope,
    ToolError, UpgradeAllRequest, UpgradeRequest,
};
use tracing::debug;

use crate::command::{run_checked, CommandRunner, SystemRunner, UvInvocation};
use crate::layout::ToolLayout;
use crate::list::{parse_pip_list_json, parse_python_version, parse_tool_list_output};
use crate::options::{path_arg, UvOptions};

/// Observer and executor backed by the `uv` command line.
#[derive(Debug, Clone)]
pub struct UvClient<R = SystemRunner> {
    options: UvOptions,
    runner: R,
}

impl UvClient<SystemRunner> {
    pub fn new(options: UvOptions) -> Self {
        let runner = match &options.sudo_path {
            Some(sudo_path) => SystemRunner::with_sudo_path(sudo_path),
            None => SystemRunner::default(),
        };
        Self::with_runner(options, runner)
    }
}

impl<R: CommandRunner> UvClient<R> {
    pub fn with_runner(options: UvOptions, runner: R) -> Self {
        Self { options, runner }
    }

    pub fn options(&self) -> &UvOptions {
        &self.options
    }

    /// `uv <cmd...> <options...> <global flags...> <params...>`
    pub fn invocation(
        &self,
        cmd: &[&str],
        options: Vec<String>,
        params: Vec<String>,
        run_as: Option<&str>,
    ) -> UvInvocation {
        let mut invocation = UvInvocation::new(self.options.program());
        invocation.args.extend(cmd.iter().map(ToString::to_string));
        invocation.args.extend(options);
        invocation.args.extend(self.options.global_args());
        invocation.args.extend(params);
        invocation.env = self.options.env.clone();
        invocation.run_as = run_as.map(ToString::to_string);
        invocation
    }

    /// A `uv tool <subcommand>` call with the scope's tool directories.
    pub fn tool_invocation(
        &self,
        subcommand: &str,
        options: Vec<String>,
        params: Vec<String>,
        scope: &Scope,
    ) -> UvInvocation {
        let mut invocation =
            self.invocation(&["tool", subcommand], options, params, scope.run_as());
        invocation
            .env
            .extend(ToolLayout::for_scope(scope, &self.options).env());
        invocation
    }

    pub fn install_invocation(&self, request: &InstallRequest) -> UvInvocation {
        let mut options = Vec::new();
        for extra in &request.extras {
            options.push("--with".to_string());
            options.push(extra.clone());
        }
        for requirements in &request.with_requirements {
            options.push("--with-requirements".to_string());
            options.push(path_arg(requirements));
        }
        for package in &request.refresh_packages {
            options.push("--refresh-package".to_string());
            options.push(package.clone());
        }
        if request.refresh {
            options.push("--refresh".to_string());
        }
        if request.reinstall {
            options.push("--reinstall".to_string());
        }
        for package in &request.reinstall_packages {
            options.push("--reinstall-package".to_string());
            options.push(package.clone());
        }
        if request.force {
            options.push("--force".to_string());
        }
        push_python_and_upgrade_options(&mut options, request.python.as_deref(), false, &[]);
        push_prerelease_option(&mut options, request.prereleases);

        self.tool_invocation(
            "install",
            options,
            vec![request.package_spec()],
            &request.scope,
        )
    }

    pub fn upgrade_invocation(&self, request: &UpgradeRequest) -> UvInvocation {
        let mut options = Vec::new();
        push_python_and_upgrade_options(
            &mut options,
            request.python.as_deref(),
            request.upgrade,
            &request.upgrade_packages,
        );
        push_prerelease_option(&mut options, request.prereleases);
        self.tool_invocation("upgrade", options, vec![request.name.clone()], &request.scope)
    }

    pub fn upgrade_all_invocation(&self, request: &UpgradeAllRequest) -> UvInvocation {
        let mut options = vec!["--all".to_string()];
        push_python_and_upgrade_options(
            &mut options,
            request.python.as_deref(),
            request.upgrade,
            &request.upgrade_packages,
        );
        push_prerelease_option(&mut options, request.prereleases);
        self.tool_invocation("upgrade", options, Vec::new(), &request.scope)
    }

    pub fn list_tool_entries(
        &self,
        names: Option<&[String]>,
        scope: &Scope,
    ) -> Result<BTreeMap<String, ObservedTool>> {
        let invocation = self.tool_invocation(
            "list",
            vec![
                "--show-paths".to_string(),
                "--show-version-specifiers".to_string(),
            ],
            Vec::new(),
            scope,
        );
        let output = run_checked(&self.runner, &invocation)?;

        let wanted: Option<Vec<String>> = names.map(|names| {
            names
                .iter()
                .map(String::as_str)
                .map(normalize_package_name)
                .collect()
        });
        let mut tools = BTreeMap::new();
        for entry in parse_tool_list_output(&output) {
            if wanted
                .as_ref()
                .is_some_and(|wanted| !wanted.contains(&normalize_package_name(&entry.name)))
            {
                continue;
            }
            let packages = self
                .venv_packages(&entry.venv_path, scope)
                .with_context(|| format!("failed listing packages of tool '{}'", entry.name))?;
            let python = resolve_venv_python(&entry.venv_path);
            let python_version = self.python_version(&python, scope)?;
            tools.insert(
                entry.name.clone(),
                ObservedTool {
                    name: entry.name,
                    python,
                    python_version,
                    install_spec: entry.install_spec,
                    version: entry.version,
                    venv_path: entry.venv_path,
                    packages,
                },
            );
        }
        Ok(tools)
    }

    fn venv_packages(
        &self,
        venv: &Path,
        scope: &Scope,
    ) -> Result<BTreeMap<String, toolstate_core::ToolVersion>> {
        let mut invocation = UvInvocation::new(self.options.program());
        invocation.args = vec![
            "pip".to_string(),
            "list".to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        invocation
            .args
            .extend(self.options.global_args_with_directory(Some(venv)));
        invocation.env = self.options.env.clone();
        invocation.run_as = scope.run_as().map(ToString::to_string);
        let output = run_checked(&self.runner, &invocation)?;
        parse_pip_list_json(&output)
    }

    fn python_version(&self, python: &Path, scope: &Scope) -> Result<String> {
        let mut invocation = UvInvocation::new(python);
        invocation.args.push("--version".to_string());
        invocation.run_as = scope.run_as().map(ToString::to_string);
        let output = run_checked(&self.runner, &invocation)?;
        Ok(parse_python_version(&output))
    }

    fn run_tool_command(&self, invocation: &UvInvocation) -> Result<(), ToolError> {
        run_checked(&self.runner, invocation)
            .map(|_| ())
            .map_err(ToolError::command)
    }
}

impl<R: CommandRunner> Observer for UvClient<R> {
    fn list_tools(
        &self,
        names: Option<&[String]>,
        scope: &Scope,
    ) -> Result<BTreeMap<String, ObservedTool>, ToolError> {
        self.list_tool_entries(names, scope)
            .map_err(ToolError::command)
    }
}

impl<R: CommandRunner> ActionExecutor for UvClient<R> {
    fn install(&self, request: &InstallRequest) -> Result<(), ToolError> {
        self.run_tool_command(&self.install_invocation(request))
    }

    fn upgrade(&self, request: &UpgradeRequest) -> Result<(), ToolError> {
        if let Some(constraint) = &request.constraint {
            debug!(
                "upgrading {} within its recorded constraint {constraint}",
                request.name
            );
        }
        self.run_tool_command(&self.upgrade_invocation(request))
    }

    fn remove(&self, name: &str, scope: &Scope) -> Result<(), ToolError> {
        let invocation = self.tool_invocation("uninstall", Vec::new(), vec![name.to_string()], scope);
        self.run_tool_command(&invocation)
    }

    fn remove_all(&self, scope: &Scope) -> Result<(), ToolError> {
        let invocation =
            self.tool_invocation("uninstall", vec!["--all".to_string()], Vec::new(), scope);
        self.run_tool_command(&invocation)
    }

    fn upgrade_all(&self, request: &UpgradeAllRequest) -> Result<(), ToolError> {
        self.run_tool_command(&self.upgrade_all_invocation(request))
    }
}

fn push_python_and_upgrade_options(
    options: &mut Vec<String>,
    python: Option<&Path>,
    upgrade: bool,
    upgrade_packages: &[String],
) {
    if let Some(python) = python {
        options.push("--python".to_string());
        options.push(path_arg(python));
    }
    if upgrade {
        options.push("--upgrade".to_string());
    }
    for package in upgrade_packages {
        options.push("--upgrade-package".to_string());
        options.push(package.clone());
    }
}

/// Lets uv pick pre-releases the index lookup already considers.
fn push_prerelease_option(options: &mut Vec<String>, prereleases: bool) {
    if prereleases {
        options.push("--prerelease".to_string());
        options.push("allow".to_string());
    }
}

/// The interpreter a tool environment runs, with symlinks resolved.
pub fn resolve_venv_python(venv: &Path) -> PathBuf {
    let python = if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    };
    fs::canonicalize(&python).unwrap_or(python)
}
