use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};
use toolstate_core::ObservedTool;
use toolstate_engine::{Changes, OutdatedReport, StateResult, ValueChange};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool) -> OutputStyle {
    if stdout_is_tty {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn current_output_style() -> OutputStyle {
    resolve_output_style(std::io::stdout().is_terminal())
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => {
            let badge = match status {
                "ok" => "[OK]",
                "changed" => "[CHANGED]",
                "pending" => "[DRY-RUN]",
                "warn" => "[WARN]",
                _ => "[ERR]",
            };
            format!("{badge} {message}")
        }
    }
}

fn result_status(result: &StateResult) -> &'static str {
    match result.result {
        None => "pending",
        Some(false) => "error",
        Some(true) if result.changes.is_empty() => "ok",
        Some(true) => "changed",
    }
}

/// Human-readable lines for one result: a status line, then one line per
/// change.
pub(crate) fn format_result_lines(result: &StateResult, style: OutputStyle) -> Vec<String> {
    let mut lines = vec![render_status_line(
        style,
        result_status(result),
        &format!("{}: {}", result.name, result.comment),
    )];
    lines.extend(
        format_change_lines(&result.changes)
            .into_iter()
            .map(|line| format!("  {line}")),
    );
    lines
}

fn format_change_lines(changes: &Changes) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(name) = &changes.installed {
        lines.push(format!("installed: {name}"));
    }
    if let Some(change) = &changes.python {
        lines.push(format!("python: {}", format_value_change(change)));
    }
    for (extra, change) in &changes.extras {
        lines.push(format!("extra {extra}: {}", format_value_change(change)));
    }
    if let Some(change) = &changes.version_spec {
        lines.push(format!("version_spec: {}", format_value_change(change)));
    }
    if let Some(change) = &changes.version {
        lines.push(format!("version: {}", format_value_change(change)));
    }
    if let Some(name) = &changes.removed {
        lines.push(format!("removed: {name}"));
    }
    if let Some(name) = &changes.upgraded {
        lines.push(format!("upgraded: {name}"));
    }
    lines
}

fn format_value_change(change: &ValueChange) -> String {
    format!(
        "{} -> {}",
        change.old.as_deref().unwrap_or("(none)"),
        change.new.as_deref().unwrap_or("(none)")
    )
}

pub(crate) fn format_tool_lines(tools: &BTreeMap<String, ObservedTool>) -> Vec<String> {
    if tools.is_empty() {
        return vec!["No tools installed".to_string()];
    }
    tools
        .values()
        .map(|tool| {
            let spec = tool
                .install_spec
                .as_deref()
                .map(|spec| format!(" [required: {spec}]"))
                .unwrap_or_default();
            format!(
                "{} {}{} (python {})",
                tool.name, tool.version, spec, tool.python_version
            )
        })
        .collect()
}

pub(crate) fn format_outdated_line(report: &OutdatedReport) -> String {
    if report.is_outdated() {
        format!(
            "{} {} -> {} (outdated)",
            report.name, report.current, report.latest
        )
    } else {
        format!("{} {} (up to date)", report.name, report.current)
    }
}

pub(crate) fn render_section_header(style: OutputStyle, title: &str) -> Option<String> {
    match style {
        OutputStyle::Plain => None,
        OutputStyle::Rich => Some(colorize(section_style(), &format!("== {title} =="))),
    }
}

/// Spinner shown while `apply` works through a state file.
pub(crate) struct ApplyProgress {
    progress_bar: Option<ProgressBar>,
}

impl ApplyProgress {
    pub(crate) fn start(style: OutputStyle, total: u64) -> Self {
        let progress_bar = if style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new(total.max(1));
            if let Ok(style) =
                ProgressStyle::with_template("{spinner:.cyan.bold} {msg:<24} {pos:>3}/{len:3}")
            {
                progress_bar.set_style(style.tick_chars(".oO@* "));
            }
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };
        Self { progress_bar }
    }

    pub(crate) fn begin(&self, name: &str) {
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_message(name.to_string());
        }
    }

    /// Prints `lines` above the spinner and advances it.
    pub(crate) fn finish_entry(&self, lines: &[String]) {
        match &self.progress_bar {
            Some(progress_bar) => {
                for line in lines {
                    progress_bar.println(line);
                }
                progress_bar.inc(1);
            }
            None => {
                for line in lines {
                    println!("{line}");
                }
            }
        }
    }

    pub(crate) fn finish(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
