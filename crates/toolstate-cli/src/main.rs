use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod completion;
mod config;
mod dispatch;
mod render;

use completion::CliCompletionShell;

#[derive(Parser, Debug)]
#[command(name = "toolstate")]
#[command(about = "Converge uv-managed tools to a declared state", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file; falls back to $TOOLSTATE_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Report what would change without touching anything.
    #[arg(long, global = true)]
    dry_run: bool,
    /// Manage the system-wide tool set.
    #[arg(long, global = true, overrides_with = "no_system")]
    system: bool,
    /// Manage the caller's own tools, even as root.
    #[arg(long, global = true, overrides_with = "system")]
    no_system: bool,
    /// Manage the tools of this user.
    #[arg(long, global = true)]
    user: Option<String>,
    /// Directory tool executables are linked into.
    #[arg(long, global = true)]
    tool_bin_dir: Option<PathBuf>,
    /// Directory tool environments live in.
    #[arg(long, global = true)]
    tool_dir: Option<PathBuf>,
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// `--system` / `--no-system`, or `None` when neither was given.
    fn system_flag(&self) -> Option<bool> {
        match (self.system, self.no_system) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ensure a tool is installed as described.
    Installed(ToolArgs),
    /// Ensure a tool is installed at the newest allowed version.
    Latest(ToolArgs),
    /// Ensure a tool is not installed.
    Absent { name: String },
    /// Uninstall every tool.
    RemoveAll,
    /// Upgrade every tool within its install-time constraint.
    UpgradeAll(UpgradeAllArgs),
    /// Converge every entry of a state file.
    Apply { file: PathBuf },
    /// Show installed tools.
    List { names: Vec<String> },
    IsInstalled { name: String },
    /// Check whether a newer allowed release exists.
    Outdated {
        name: String,
        /// Constraint to check against instead of the install-time one.
        #[arg(long)]
        version_spec: Option<String>,
    },
    /// Look up the newest release on the package index.
    LatestVersion {
        name: String,
        version_spec: Option<String>,
    },
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct ToolArgs {
    name: String,
    /// Version constraint, e.g. `>=2.0,<3`.
    #[arg(long)]
    version_spec: Option<String>,
    /// Extra package to install alongside, as `name` or `name<constraint>`.
    #[arg(long = "extra")]
    extras: Vec<String>,
    #[arg(long)]
    python: Option<PathBuf>,
    #[arg(long)]
    upgrade: bool,
    #[arg(long)]
    force: bool,
    #[arg(long)]
    refresh: bool,
    #[arg(long = "refresh-package")]
    refresh_packages: Vec<String>,
    #[arg(long = "reinstall-package")]
    reinstall_packages: Vec<String>,
    #[arg(long = "upgrade-package")]
    upgrade_packages: Vec<String>,
    #[arg(long = "with-requirements")]
    with_requirements: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
struct UpgradeAllArgs {
    #[arg(long)]
    python: Option<PathBuf>,
    #[arg(long)]
    upgrade: bool,
    #[arg(long = "upgrade-package")]
    upgrade_packages: Vec<String>,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let succeeded = dispatch::run_cli(cli)?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
