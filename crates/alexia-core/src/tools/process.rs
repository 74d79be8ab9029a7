//! Background process tools, backed by the process supervisor.

use alexia_execution::system_processes;
use anyhow::{anyhow, Result};
use std::time::Duration;
use tracing::{debug, info};

use super::{integer_arg, required_integer, required_str, ToolArgs, ToolContext, ToolOutput};

fn pid_arg(args: &ToolArgs) -> Result<u32> {
    let pid = required_integer(args, "pid")?;
    u32::try_from(pid).map_err(|_| anyhow!("'{}' is not a valid process id", pid))
}

fn format_lines(lines: &[String]) -> String {
    lines.join("\n")
}

/// Execute the `start_process` tool: spawn, wait briefly, and report the
/// pid together with whatever output arrived.
pub async fn execute_start_process(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let command = required_str(&args, "command")?;
    let pid = ctx.processes.start(command, ctx.working_dir()).await?;
    info!("Started background process {}: {}", pid, command);

    let initial = ctx.processes.drain(pid, ctx.settings.start_output_wait).await?;
    let initial = if initial.is_empty() {
        "No initial output captured.".to_string()
    } else {
        format_lines(&initial)
    };

    Ok(ToolOutput::text(format!(
        "Successfully started process with PID: {}.\nInitial output:\n---\n{}\n---\n\
         Use this output to inform your next action. Use 'stop_process' to terminate it.",
        pid, initial
    )))
}

/// Execute the `read_process_output` tool.
pub async fn execute_read_process_output(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let pid = pid_arg(&args)?;
    let wait = integer_arg(&args, "wait_seconds")?.unwrap_or(0);
    debug!("Draining process {} after {}s", pid, wait);

    let lines = ctx.processes.drain(pid, Duration::from_secs(wait)).await?;
    if lines.is_empty() {
        return Ok(ToolOutput::text(format!(
            "No new output from process {}.",
            pid
        )));
    }
    Ok(ToolOutput::text(format!(
        "Output from process {}:\n{}",
        pid,
        format_lines(&lines)
    )))
}

/// Execute the `stop_process` tool.
pub async fn execute_stop_process(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let pid = pid_arg(&args)?;
    ctx.processes.stop(pid).await?;
    info!("Stopped background process {}", pid);
    Ok(ToolOutput::text(format!(
        "Successfully stopped process with PID {}.",
        pid
    )))
}

/// Execute the `list_processes` tool: every process on the host, with the
/// ones this session started marked as managed.
pub async fn execute_list_processes(_args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let managed = ctx.processes.snapshot();
    let rows = tokio::task::spawn_blocking(move || system_processes(managed)).await?;
    Ok(ToolOutput::ProcessTable(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolSettings;
    use crate::utils::extract_pid;
    use alexia_execution::{ProcessControl, ProcessSupervisor};
    use serde_json::json;
    use std::sync::Arc;

    fn args(value: serde_json::Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    fn ctx(supervisor: Arc<ProcessSupervisor>) -> ToolContext {
        ToolContext::new(supervisor).with_settings(ToolSettings {
            start_output_wait: Duration::from_millis(500),
            ..ToolSettings::default()
        })
    }

    #[tokio::test]
    async fn test_start_read_stop() {
        let supervisor = Arc::new(ProcessSupervisor::with_stop_grace(Duration::from_secs(1)));

        let out = execute_start_process(
            args(json!({"command": "echo ready; sleep 30"})),
            ctx(supervisor.clone()),
        )
        .await
        .unwrap();
        let text = out.render();
        assert!(text.contains("ready"), "{}", text);
        let pid = extract_pid(&text).unwrap();

        let listed = execute_list_processes(ToolArgs::new(), ctx(supervisor.clone()))
            .await
            .unwrap();
        match listed {
            ToolOutput::ProcessTable(rows) => {
                let row = rows.iter().find(|r| r.pid == pid).unwrap();
                assert!(row.is_managed());
                assert!(rows.iter().any(|r| r.pid == std::process::id() && !r.is_managed()));
            }
            other => panic!("unexpected output: {:?}", other),
        }

        let out = execute_read_process_output(args(json!({"pid": pid})), ctx(supervisor.clone()))
            .await
            .unwrap();
        assert!(out.render().starts_with("No new output"));

        let out = execute_stop_process(args(json!({"pid": pid.to_string()})), ctx(supervisor.clone()))
            .await
            .unwrap();
        assert_eq!(
            out.render(),
            format!("Successfully stopped process with PID {}.", pid)
        );
        assert!(supervisor.list().is_empty());
    }

    #[tokio::test]
    async fn test_stop_unknown_pid_is_an_error() {
        let supervisor = Arc::new(ProcessSupervisor::new());
        let err = execute_stop_process(args(json!({"pid": 999_999})), ctx(supervisor))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("999999"));
    }

    #[tokio::test]
    async fn test_pid_must_be_an_integer() {
        let supervisor = Arc::new(ProcessSupervisor::new());
        let err = execute_stop_process(args(json!({"pid": "$LAST_PID"})), ctx(supervisor))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must be an integer"));
    }
}
