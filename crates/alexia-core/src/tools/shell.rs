//! Shell command execution tools.

use alexia_execution::ShellExecutor;
use anyhow::Result;
use tracing::debug;

use super::{required_str, ToolArgs, ToolContext, ToolOutput};

/// Execute the `execute_command` tool: run to completion in the working
/// directory and report merged output.
pub async fn execute_command(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let command = required_str(&args, "command")?;
    debug!("Command string: {}", command);

    let dir = ctx.working_dir().map(|d| d.to_string_lossy().to_string());
    let executor = ShellExecutor::with_timeout(ctx.settings.shell_timeout);
    let result = executor.execute(command, dir.as_deref()).await?;

    debug!(
        "Command finished: exit_code={}, timed_out={}",
        result.exit_code, result.timed_out
    );
    Ok(ToolOutput::Text(result.to_tool_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolSettings;
    use alexia_execution::ProcessSupervisor;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn args(command: &str) -> ToolArgs {
        json!({ "command": command }).as_object().cloned().unwrap()
    }

    fn ctx(dir: &TempDir) -> ToolContext {
        ToolContext::new(Arc::new(ProcessSupervisor::new())).with_working_dir(dir.path())
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("marker.txt"), "").unwrap();

        let out = execute_command(args("ls"), ctx(&temp_dir)).await.unwrap();
        assert!(out.render().contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_failure_reports_exit_code() {
        let temp_dir = TempDir::new().unwrap();
        let out = execute_command(args("echo oops >&2; exit 3"), ctx(&temp_dir))
            .await
            .unwrap();
        assert!(out.is_error());
        assert!(out.render().contains("exit code 3"));
        assert!(out.render().contains("oops"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let settings = ToolSettings {
            shell_timeout: Duration::from_millis(200),
            ..ToolSettings::default()
        };
        let out = execute_command(args("sleep 5"), ctx(&temp_dir).with_settings(settings))
            .await
            .unwrap();
        assert_eq!(out.render(), "Error: Command timed out.");
    }
}
