use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

/// A fully described external command, before any privilege wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UvInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub run_as: Option<String>,
}

impl UvInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            run_as: None,
        }
    }

    /// Shell-quoted command line used in logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .map(|arg| shell_quote(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Executes invocations; swapped out in tests.
pub trait CommandRunner {
    fn run(&self, invocation: &UvInvocation) -> Result<CommandOutput>;
}

impl<F> CommandRunner for F
where
    F: Fn(&UvInvocation) -> Result<CommandOutput>,
{
    fn run(&self, invocation: &UvInvocation) -> Result<CommandOutput> {
        self(invocation)
    }
}

/// Runs commands on the host, switching user through `sudo` when asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemRunner {
    sudo_path: PathBuf,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            sudo_path: PathBuf::from("sudo"),
        }
    }
}

impl SystemRunner {
    pub fn with_sudo_path(sudo_path: impl Into<PathBuf>) -> Self {
        Self {
            sudo_path: sudo_path.into(),
        }
    }

    pub fn build_command(&self, invocation: &UvInvocation) -> Command {
        match &invocation.run_as {
            Some(user) => {
                let mut command = Command::new(&self.sudo_path);
                command
                    .arg("-n")
                    .arg("-H")
                    .arg("-u")
                    .arg(user)
                    .arg("--")
                    .arg("env");
                for (key, value) in &invocation.env {
                    command.arg(format!("{key}={value}"));
                }
                command.arg(&invocation.program).args(&invocation.args);
                command
            }
            None => {
                let mut command = Command::new(&invocation.program);
                command.args(&invocation.args).envs(&invocation.env);
                command
            }
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &UvInvocation) -> Result<CommandOutput> {
        let output = self.build_command(invocation).output().map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                return anyhow!(
                    "failed to start '{}': executable not found; install it or configure its path",
                    invocation.program.display()
                );
            }
            anyhow!(err).context(format!("failed to start '{}'", invocation.display()))
        })?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs `invocation` and returns stdout, failing on a non-zero exit.
pub(crate) fn run_checked<R: CommandRunner>(runner: &R, invocation: &UvInvocation) -> Result<String> {
    debug!(
        "running command {} with env {:?} as {}",
        invocation.display(),
        invocation.env,
        invocation.run_as.as_deref().unwrap_or("current user")
    );
    let output = runner
        .run(invocation)
        .with_context(|| format!("Failed running '{}'", invocation.display()))?;
    if !output.success {
        let detail = if output.stderr.trim().is_empty() {
            output.stdout.trim()
        } else {
            output.stderr.trim()
        };
        bail!("Failed running '{}': {detail}", invocation.display());
    }
    Ok(output.stdout)
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg.chars().all(|ch| {
            ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '=' | '@' | '+' | ',')
        });
    if safe {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\"'\"'"))
}
