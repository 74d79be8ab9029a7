//! Display utilities for Alexia CLI.
//!
//! Formatting shared by the console UI writer and the startup sequence.

use alexia_core::ToolArgs;
use alexia_execution::SystemProcess;
use alexia_providers::ModelInfo;
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Format a path for display, replacing the home directory with ~.
pub fn format_workspace_path(path: &Path) -> String {
    let path_str = path.display().to_string();
    dirs::home_dir()
        .and_then(|home| {
            path_str
                .strip_prefix(&home.display().to_string())
                .map(|s| format!("~{}", s))
        })
        .unwrap_or(path_str)
}

/// Interactive prompt: `(dir) >>> `.
pub fn build_prompt(working_dir: &Path) -> String {
    let name = working_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("/");
    format!("({}) >>> ", name)
}

/// One `  - key: value` line per argument. Strings are shown unquoted.
pub fn format_arguments(arguments: &ToolArgs) -> String {
    if arguments.is_empty() {
        return "  (no arguments)".to_string();
    }
    arguments
        .iter()
        .map(|(key, value)| {
            let shown = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("  - {}: {}", key, shown)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `1h 02m 03s` style uptime.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Host process table, aligned for the terminal. Managed rows carry their
/// uptime and the command Alexia started.
pub fn format_process_table(processes: &[SystemProcess]) -> String {
    if processes.is_empty() {
        return "No processes found.".to_string();
    }
    let mut lines = vec![format!(
        "{:<8} {:>6} {:>6} {:<8} {:<12} {}",
        "PID", "CPU%", "MEM%", "MANAGED", "UPTIME", "NAME"
    )];
    for p in processes {
        let (managed, uptime, name) = match &p.managed {
            Some(summary) => ("Yes", format_uptime(summary.uptime), summary.command.as_str()),
            None => ("No", "-".to_string(), p.name.as_str()),
        };
        lines.push(format!(
            "{:<8} {:>6.1} {:>6.1} {:<8} {:<12} {}",
            p.pid, p.cpu_percent, p.memory_percent, managed, uptime, name
        ));
    }
    lines.join("\n")
}

/// Table of the models a host serves: name, size in GB, modification date.
pub fn format_models_table(models: &[ModelInfo]) -> String {
    if models.is_empty() {
        return "No models are installed on this host.".to_string();
    }
    let name_width = models
        .iter()
        .map(|m| m.name.len())
        .max()
        .unwrap_or(0)
        .max("Model Name".len());

    let mut lines = vec![format!(
        "{:<width$}  {:>10}  {}",
        "Model Name",
        "Size",
        "Modified",
        width = name_width
    )];
    for model in models {
        let modified = model.modified_at.split('T').next().unwrap_or_default();
        lines.push(format!(
            "{:<width$}  {:>7.2} GB  {}",
            model.name,
            model.size_gb(),
            modified,
            width = name_width
        ));
    }
    lines.join("\n")
}

/// Startup banner: name, model, host, and working directory.
pub fn print_banner(model: Option<&str>, host: &str, working_dir: &Path) {
    println!();
    println!(
        "{}alexia{} >> terminal assistant for local models",
        SetForegroundColor(Color::Cyan),
        ResetColor
    );
    println!(
        "   model: {}{}{} | host: {}",
        SetForegroundColor(Color::Yellow),
        model.unwrap_or("Not Specified"),
        ResetColor,
        host
    );
    println!("   cwd:   {}", format_workspace_path(working_dir));
    println!();
}
