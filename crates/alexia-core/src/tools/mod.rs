//! Tool implementations.
//!
//! Tools are organized by category:
//! - `file_ops` - File reading, writing, searching, and directory changes
//! - `shell` - Foreground shell commands
//! - `process` - Background processes via the process supervisor
//! - `web` - Fetching URLs and opening the browser

pub mod executor;
pub mod file_ops;
pub mod process;
pub mod shell;
pub mod web;

pub use executor::{ToolContext, ToolSettings};

use alexia_execution::SystemProcess;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::path::PathBuf;

/// Arguments of a tool invocation, keyed by parameter name.
pub type ToolArgs = serde_json::Map<String, Value>;

/// What a tool hands back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    /// The session's working directory should move here.
    DirectoryChanged(PathBuf),
    /// Host processes, busiest first. Rendered as a table by the display.
    ProcessTable(Vec<SystemProcess>),
}

impl ToolOutput {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Failure text in the `Error: ...` convention the model understands.
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::Text(format!("Error: {}", message))
    }

    /// Textual form folded into the conversation history.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::DirectoryChanged(path) => {
                format!("Changed working directory to '{}'.", path.display())
            }
            Self::ProcessTable(processes) => render_process_table(processes),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim_start().starts_with("Error:"))
    }
}

/// Managed rows show the command the session started instead of the
/// executable name.
fn render_process_table(processes: &[SystemProcess]) -> String {
    if processes.is_empty() {
        return "No processes found.".to_string();
    }
    let mut lines = vec!["PID\tCPU%\tMEM%\tMANAGED\tNAME".to_string()];
    for p in processes {
        let name = p.managed.as_ref().map_or(p.name.as_str(), |m| m.command.as_str());
        lines.push(format!(
            "{}\t{:.1}\t{:.1}\t{}\t{}",
            p.pid,
            p.cpu_percent,
            p.memory_percent,
            if p.is_managed() { "Yes" } else { "No" },
            name
        ));
    }
    lines.join("\n")
}

/// Fetch a required string argument.
pub fn required_str<'a>(args: &'a ToolArgs, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Missing required argument '{}'", name))
}

/// Fetch an optional string argument, falling back to `default`.
pub fn optional_str<'a>(args: &'a ToolArgs, name: &str, default: &'a str) -> &'a str {
    args.get(name).and_then(Value::as_str).unwrap_or(default)
}

/// Integer argument; numeric strings such as `"42"` are accepted too.
pub fn integer_arg(args: &ToolArgs, name: &str) -> Result<Option<u64>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| anyhow!("Argument '{}' must be a non-negative integer", name)),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Argument '{}' must be an integer, got '{}'", name, s)),
        Some(other) => Err(anyhow!("Argument '{}' must be an integer, got {}", name, other)),
    }
}

pub fn required_integer(args: &ToolArgs, name: &str) -> Result<u64> {
    integer_arg(args, name)?.ok_or_else(|| anyhow!("Missing required argument '{}'", name))
}
