use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use toolstate_core::{
    parse_optional_constraint, ActionExecutor, DesiredSpec, ExtraRequirement, Observer, Scope,
    StateFile, ToolEntry, ToolError, ToolState, UpgradeAllRequest, VersionResolver,
};
use toolstate_engine::{Engine, ExecutionContext, StateResult};
use toolstate_resolver::PackageIndex;
use toolstate_uv::UvClient;

use crate::completion::write_completions_script;
use crate::config::Config;
use crate::render::{
    current_output_style, format_outdated_line, format_result_lines, format_tool_lines,
    render_section_header, ApplyProgress, OutputStyle,
};
use crate::{Cli, Commands, ToolArgs, UpgradeAllArgs};

/// Runs one command; `Ok(false)` means some result failed.
pub(crate) fn run_cli(cli: Cli) -> Result<bool> {
    if let Commands::Completions { shell } = cli.command {
        write_completions_script(shell, &mut io::stdout().lock())?;
        return Ok(true);
    }

    let config = Config::load(cli.config.as_deref())?;
    let is_superuser = is_superuser();
    let context = ExecutionContext::new(cli.dry_run, is_superuser);
    let scope = Scope::resolve(cli.system_flag(), cli.user.as_deref(), is_superuser)?;
    let uv_options = config
        .uv
        .clone()
        .with_tool_dirs(cli.tool_bin_dir.clone(), cli.tool_dir.clone());

    let client = UvClient::new(uv_options.clone());
    let index = PackageIndex::new(config.index.options())?;
    let engine = Engine::new(&client, &index, &client, context);
    let style = current_output_style();

    match cli.command {
        Commands::Installed(args) => {
            let result = engine.installed(&desired_spec(&args, scope)?)?;
            emit_results(&[result], cli.json, style)
        }
        Commands::Latest(args) => {
            let result = engine.latest(&desired_spec(&args, scope)?)?;
            emit_results(&[result], cli.json, style)
        }
        Commands::Absent { name } => {
            let result = engine.absent(&name, &scope)?;
            emit_results(&[result], cli.json, style)
        }
        Commands::RemoveAll => {
            let result = engine.remove_all(&scope)?;
            emit_results(&[result], cli.json, style)
        }
        Commands::UpgradeAll(args) => {
            let request = upgrade_all_request(&args, scope, config.index.include_prereleases);
            let result = engine.upgrade_all(&request)?;
            emit_results(&[result], cli.json, style)
        }
        Commands::Apply { file } => {
            let results = apply_state_file(&file, cli.json, style, |entry| {
                if entry.tool_bin_dir.is_none() && entry.tool_dir.is_none() {
                    return apply_entry(&engine, entry, &scope);
                }
                let options = uv_options
                    .clone()
                    .with_tool_dirs(entry.tool_bin_dir.clone(), entry.tool_dir.clone());
                let client = UvClient::new(options);
                let engine = Engine::new(&client, &index, &client, context);
                apply_entry(&engine, entry, &scope)
            })?;
            if cli.json {
                print_json(&results)?;
            }
            Ok(results.iter().all(|result| !result.is_failure()))
        }
        Commands::List { names } => {
            let filter = (!names.is_empty()).then_some(names.as_slice());
            let tools = client.list_tools(filter, &scope)?;
            if cli.json {
                print_json(&tools)?;
            } else {
                for line in format_tool_lines(&tools) {
                    println!("{line}");
                }
            }
            Ok(true)
        }
        Commands::IsInstalled { name } => {
            let installed = engine.is_installed(&name, &scope)?;
            if cli.json {
                print_json(&installed)?;
            } else {
                println!("{installed}");
            }
            Ok(true)
        }
        Commands::Outdated { name, version_spec } => {
            let constraint = parse_optional_constraint(version_spec.as_deref())?;
            let report = engine.outdated(&name, &scope, constraint.as_ref())?;
            if cli.json {
                print_json(&serde_json::json!({
                    "name": report.name,
                    "current": report.current,
                    "latest": report.latest,
                    "outdated": report.is_outdated(),
                }))?;
            } else {
                println!("{}", format_outdated_line(&report));
            }
            Ok(true)
        }
        Commands::LatestVersion { name, version_spec } => {
            let constraint = parse_optional_constraint(version_spec.as_deref())?;
            let latest = index.latest_version(&name, constraint.as_ref())?;
            if cli.json {
                print_json(&latest)?;
            } else {
                println!("{latest}");
            }
            Ok(true)
        }
        Commands::Completions { .. } => Ok(true),
    }
}

/// Runs `converge` over every entry of `file`; an entry's error becomes its
/// failed result.
fn apply_state_file<F>(
    file: &Path,
    json: bool,
    style: OutputStyle,
    mut converge: F,
) -> Result<Vec<StateResult>>
where
    F: FnMut(&ToolEntry) -> Result<StateResult, ToolError>,
{
    let raw = fs::read_to_string(file)
        .with_context(|| format!("failed reading state file: {}", file.display()))?;
    let state = StateFile::from_toml_str(&raw)
        .with_context(|| format!("invalid state file: {}", file.display()))?;

    if !json {
        if let Some(header) = render_section_header(style, &format!("apply {}", file.display())) {
            println!("{header}");
        }
    }
    let progress_style = if json { OutputStyle::Plain } else { style };
    let progress = ApplyProgress::start(progress_style, state.tools.len() as u64);

    let mut results = Vec::with_capacity(state.tools.len());
    for entry in &state.tools {
        progress.begin(entry.name.trim());
        let result = converge(entry)
            .unwrap_or_else(|err| StateResult::failed(entry.name.trim(), err.to_string()));
        if !json {
            progress.finish_entry(&format_result_lines(&result, style));
        }
        results.push(result);
    }
    progress.finish();
    Ok(results)
}

/// Entries without their own target inherit the command line's.
pub(crate) fn apply_entry<O, R, E>(
    engine: &Engine<'_, O, R, E>,
    entry: &ToolEntry,
    scope: &Scope,
) -> Result<StateResult, ToolError>
where
    O: Observer + ?Sized,
    R: VersionResolver + ?Sized,
    E: ActionExecutor + ?Sized,
{
    let scope = if entry.system.is_none() && entry.user.is_none() {
        scope.clone()
    } else {
        entry.scope(engine.context().is_superuser)?
    };
    match entry.state {
        ToolState::Absent => engine.absent(entry.name.trim(), &scope),
        ToolState::Latest => engine.latest(&entry.desired_spec(scope)?),
        ToolState::Installed => engine.installed(&entry.desired_spec(scope)?),
    }
}

pub(crate) fn desired_spec(args: &ToolArgs, scope: Scope) -> Result<DesiredSpec, ToolError> {
    let constraint = parse_optional_constraint(args.version_spec.as_deref())?;
    let extras = args
        .extras
        .iter()
        .map(|extra| ExtraRequirement::parse(extra))
        .collect::<Result<Vec<_>, _>>()?;

    let mut spec = DesiredSpec::new(args.name.clone(), scope)?
        .with_constraint(constraint)
        .with_extras(extras)
        .with_python(args.python.clone())
        .with_upgrade(args.upgrade);
    spec.force = args.force;
    spec.refresh = args.refresh;
    spec.refresh_packages = args.refresh_packages.clone();
    spec.reinstall_packages = args.reinstall_packages.clone();
    spec.upgrade_packages = args.upgrade_packages.clone();
    spec.with_requirements = args.with_requirements.clone();
    Ok(spec)
}

pub(crate) fn upgrade_all_request(
    args: &UpgradeAllArgs,
    scope: Scope,
    prereleases: bool,
) -> UpgradeAllRequest {
    UpgradeAllRequest {
        scope,
        python: args.python.clone(),
        upgrade: args.upgrade,
        upgrade_packages: args.upgrade_packages.clone(),
        prereleases,
    }
}

fn emit_results(results: &[StateResult], json: bool, style: OutputStyle) -> Result<bool> {
    if json {
        match results {
            [single] => print_json(single)?,
            many => print_json(&many)?,
        }
    } else {
        for result in results {
            for line in format_result_lines(result, style) {
                println!("{line}");
            }
        }
    }
    Ok(results.iter().all(|result| !result.is_failure()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed rendering JSON output")?;
    println!("{rendered}");
    Ok(())
}

#[cfg(unix)]
fn is_superuser() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_superuser() -> bool {
    false
}
