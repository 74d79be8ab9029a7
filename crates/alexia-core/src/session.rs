//! The interactive session: conversation history, working directory, and
//! the loop that turns model output into confirmed tool executions.

use alexia_config::{Config, SessionMode};
use alexia_execution::{OutputReceiver, ProcessControl, ShellExecutor};
use alexia_providers::{ChatRequest, GatewayError, Message, ModelGateway};
use anyhow::Result;
use futures_util::StreamExt;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::{Tool, ToolCatalog};
use crate::error::SessionError;
use crate::prompts::{build_system_prompt, plan_summary_prompt, tool_result_message};
use crate::response_parser::{parse, ParsedResponse, ToolInvocation};
use crate::tools::{ToolArgs, ToolContext, ToolOutput, ToolSettings};
use crate::ui_writer::UiWriter;
use crate::utils::{extract_pid, resolve_directory};

/// Where the session is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingUserInput,
    Thinking,
    PlainAnswer,
    ToolRequested,
    PlanProposed,
    Confirming,
    Executing,
    Ended,
}

/// What the caller should do after a line of input was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub model: String,
    pub mode: SessionMode,
    /// Replaces the default preamble of the system prompt.
    pub custom_prompt: Option<String>,
    pub working_dir: PathBuf,
    /// Consecutive tool calls allowed in one conversational turn.
    pub max_tool_iterations: usize,
    pub tool_settings: ToolSettings,
}

impl SessionOptions {
    pub fn new(model: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            mode: SessionMode::Conversational,
            custom_prompt: None,
            working_dir: working_dir.into(),
            max_tool_iterations: 10,
            tool_settings: ToolSettings::default(),
        }
    }

    pub fn from_config(config: &Config, model: impl Into<String>) -> Result<Self> {
        let working_dir = std::env::current_dir()?;
        Ok(Self {
            model: model.into(),
            mode: config.agent.mode,
            custom_prompt: config.resolve_system_prompt()?,
            working_dir,
            max_tool_iterations: config.agent.max_tool_iterations,
            tool_settings: ToolSettings {
                shell_timeout: Duration::from_secs(config.agent.shell_timeout_seconds),
                start_output_wait: Duration::from_secs(config.agent.start_output_wait_seconds),
                ..ToolSettings::default()
            },
        })
    }

    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = Some(prompt.into());
        self
    }

    pub fn with_tool_settings(mut self, settings: ToolSettings) -> Self {
        self.tool_settings = settings;
        self
    }
}

/// Forwards shell escape output to the display as it arrives.
struct LiveOutput<'a, W: UiWriter>(&'a W);

impl<W: UiWriter> OutputReceiver for LiveOutput<'_, W> {
    fn on_output_line(&self, line: &str) {
        self.0.show_output_line(line);
    }
}

/// How a single tool request ended.
enum StepOutcome {
    /// The tool ran.
    Executed {
        tool_name: &'static str,
        output: ToolOutput,
    },
    /// Unknown tool or rejected; history was rolled back.
    Aborted,
}

pub struct Session<W: UiWriter> {
    gateway: Arc<dyn ModelGateway>,
    processes: Arc<dyn ProcessControl>,
    catalog: Arc<ToolCatalog>,
    ui_writer: W,
    http: reqwest::Client,
    options: SessionOptions,
    history: Vec<Message>,
    working_dir: PathBuf,
    system_prompt: String,
    state: SessionState,
    /// History length a request that does not run is rolled back to.
    checkpoint: usize,
}

impl<W: UiWriter> Session<W> {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        processes: Arc<dyn ProcessControl>,
        catalog: Arc<ToolCatalog>,
        ui_writer: W,
        options: SessionOptions,
    ) -> Self {
        let working_dir = options.working_dir.clone();
        let mut session = Self {
            gateway,
            processes,
            catalog,
            ui_writer,
            http: reqwest::Client::new(),
            options,
            history: Vec::new(),
            working_dir,
            system_prompt: String::new(),
            state: SessionState::AwaitingUserInput,
            checkpoint: 0,
        };
        session.refresh_system_prompt();
        session
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn model(&self) -> &str {
        &self.options.model
    }

    pub fn mode(&self) -> SessionMode {
        self.options.mode
    }

    pub fn ui_writer(&self) -> &W {
        &self.ui_writer
    }

    /// Handle one line typed by the user.
    pub async fn handle_input(&mut self, line: &str) -> Flow {
        let input = line.trim();
        if input.is_empty() {
            return Flow::Continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            info!("Session ended by user");
            self.state = SessionState::Ended;
            return Flow::Exit;
        }

        if let Some(command) = input.strip_prefix('!') {
            self.run_shell_escape(command.trim()).await;
        } else {
            self.run_turn(input).await;
        }
        self.state = SessionState::AwaitingUserInput;
        Flow::Continue
    }

    /// `!cmd` runs in the working directory without involving the model;
    /// `!cd dir` moves the session itself.
    async fn run_shell_escape(&mut self, command: &str) {
        if command.is_empty() {
            self.ui_writer.show_error("Usage: !<command>");
            return;
        }

        if command == "cd" || command.starts_with("cd ") {
            let target = command[2..].trim();
            let target = if target.is_empty() { "~" } else { target };
            match resolve_directory(Some(&self.working_dir), target) {
                Ok(dir) => {
                    self.set_working_dir(dir);
                    self.ui_writer.show_cwd_change(&self.working_dir);
                }
                Err(reason) => {
                    let err = SessionError::directory(target, reason);
                    self.ui_writer.show_error(&err.to_string());
                }
            }
            return;
        }

        debug!("Shell escape: {}", command);
        let dir = self.working_dir.to_string_lossy().to_string();
        let executor = ShellExecutor::with_timeout(self.options.tool_settings.shell_timeout);
        let live = LiveOutput(&self.ui_writer);
        match executor
            .execute_streaming_in_dir(command, &live, Some(&dir))
            .await
        {
            Ok(result) => match result.failure() {
                Some(failure) => self.ui_writer.show_error(&failure),
                None if result.output.trim().is_empty() => self
                    .ui_writer
                    .show_info("Command executed successfully with no output."),
                None => {}
            },
            Err(e) => self.ui_writer.show_error(&format!("Error: {:#}", e)),
        }
    }

    /// One user request: think, then act on whatever the model asked for
    /// until it answers in plain text.
    async fn run_turn(&mut self, input: &str) {
        self.checkpoint = self.history.len();
        self.history.push(Message::user(input));

        let mut tool_calls = 0;
        loop {
            let response = match self.think().await {
                Ok(response) => response,
                Err(e) => {
                    self.handle_gateway_error(e);
                    return;
                }
            };

            match parse(&response) {
                None => {
                    self.state = SessionState::PlainAnswer;
                    self.ui_writer.show_answer(&response);
                    self.history.push(Message::assistant(response));
                    return;
                }
                Some(ParsedResponse::Plan(steps)) => {
                    self.execute_plan(&response, steps).await;
                    return;
                }
                Some(ParsedResponse::ToolCall(invocation)) => {
                    self.state = SessionState::ToolRequested;
                    match self.run_tool_request(invocation).await {
                        StepOutcome::Aborted => return,
                        StepOutcome::Executed { tool_name, output } => {
                            self.history.push(Message::assistant(response));
                            self.history.push(Message::user(tool_result_message(
                                tool_name,
                                &output.render(),
                            )));
                            self.advance_checkpoint();
                        }
                    }
                }
            }

            tool_calls += 1;
            if tool_calls >= self.options.max_tool_iterations {
                warn!("Tool call limit reached ({})", tool_calls);
                self.ui_writer.show_error(&format!(
                    "Stopped after {} consecutive tool calls without a final answer.",
                    tool_calls
                ));
                return;
            }
        }
    }

    /// Run the steps of a plan in order, asking before each one. The first
    /// rejection, unknown tool, or failed step abandons the rest. Results of
    /// steps that already ran stay in history.
    async fn execute_plan(&mut self, response: &str, steps: Vec<ToolInvocation>) {
        self.state = SessionState::PlanProposed;
        if steps.is_empty() {
            self.ui_writer.show_error("The model proposed an empty plan.");
            self.rollback();
            return;
        }

        self.ui_writer.show_plan(&steps);
        self.history.push(Message::assistant(response));

        let total = steps.len();
        let mut last_pid: Option<u32> = None;
        let mut last_result = String::new();

        for (index, mut step) in steps.into_iter().enumerate() {
            let number = index + 1;
            substitute_pid(&mut step.arguments, last_pid);
            debug!("Plan step {}/{}: {}", number, total, step.tool_name);

            let (tool_name, output) = match self.run_tool_request(step).await {
                StepOutcome::Aborted => {
                    self.ui_writer
                        .show_info(&format!("Plan aborted at step {}/{}.", number, total));
                    return;
                }
                StepOutcome::Executed { tool_name, output } => (tool_name, output),
            };
            let result = output.render();

            self.history
                .push(Message::user(tool_result_message(tool_name, &result)));
            self.advance_checkpoint();

            if output.is_error() {
                self.ui_writer
                    .show_error(&format!("Step {} failed. Aborting plan.", number));
                return;
            }
            if let Some(pid) = extract_pid(&result) {
                last_pid = Some(pid);
            }
            last_result = result;
        }

        self.ui_writer.show_info("Plan finished.");
        self.history.push(Message::user(plan_summary_prompt(&last_result)));
        match self.think().await {
            Ok(summary) => {
                self.ui_writer.show_answer(&summary);
                self.history.push(Message::assistant(summary));
            }
            Err(e) => self.handle_gateway_error(e),
        }
    }

    /// Look up, confirm, and execute one tool request. Rolls the history
    /// back to the checkpoint when the request does not run.
    async fn run_tool_request(&mut self, invocation: ToolInvocation) -> StepOutcome {
        let Some(tool) = self.catalog.lookup(&invocation.tool_name).cloned() else {
            let err = SessionError::UnknownTool(invocation.tool_name);
            warn!("{}", err);
            self.ui_writer.show_error(&err.to_string());
            self.rollback();
            return StepOutcome::Aborted;
        };

        self.state = SessionState::Confirming;
        self.ui_writer
            .show_tool_request(tool.name, &invocation.arguments);
        if !self
            .ui_writer
            .confirm(&format!("Execute tool '{}'?", tool.name))
        {
            self.ui_writer.show_info("Tool execution cancelled by user.");
            self.rollback();
            return StepOutcome::Aborted;
        }

        self.state = SessionState::Executing;
        let output = self.invoke(&tool, invocation.arguments).await;
        StepOutcome::Executed {
            tool_name: tool.name,
            output,
        }
    }

    /// Run a tool on its own task and apply any session-level effects of
    /// its output.
    async fn invoke(&mut self, tool: &Tool, arguments: ToolArgs) -> ToolOutput {
        let mut ctx = ToolContext::new(self.processes.clone())
            .with_settings(self.options.tool_settings);
        ctx.http = self.http.clone();
        if tool.needs_working_directory {
            ctx = ctx.with_working_dir(self.working_dir.clone());
        }

        info!("Executing tool: {}", tool.name);
        let handler = tool.handler.clone();
        let joined = tokio::spawn(async move { handler.call(arguments, ctx).await }).await;

        let output = match joined {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => ToolOutput::error(format!("{:#}", e)),
            Err(e) => ToolOutput::error(format!("An unexpected exception occurred: {}", e)),
        };

        match &output {
            ToolOutput::Text(text) => self.ui_writer.show_tool_result(tool.name, text),
            ToolOutput::DirectoryChanged(dir) => {
                self.set_working_dir(dir.clone());
                self.ui_writer.show_cwd_change(dir);
            }
            ToolOutput::ProcessTable(processes) => self.ui_writer.show_process_table(processes),
        }
        output
    }

    /// Stream one completion for the current history.
    async fn think(&mut self) -> Result<String, GatewayError> {
        self.state = SessionState::Thinking;
        self.ui_writer.show_thinking(true);
        let result = self.collect_completion().await;
        self.ui_writer.show_thinking(false);
        result
    }

    async fn collect_completion(&self) -> Result<String, GatewayError> {
        let request = ChatRequest::new(self.options.model.clone(), self.history.clone())
            .with_system_prompt(self.system_prompt.clone());
        debug!(
            "Requesting completion from {} with {} turns",
            self.gateway.name(),
            self.history.len()
        );
        let mut stream = self.gateway.stream_chat(request).await?;

        let mut response = String::new();
        while let Some(fragment) = stream.next().await {
            response.push_str(&fragment?);
        }
        debug!("Model response: {} chars", response.len());
        Ok(response)
    }

    /// Connectivity failures undo everything since the checkpoint; anything
    /// else the backend said is kept as the turn's answer.
    fn handle_gateway_error(&mut self, error: GatewayError) {
        let err = SessionError::from(error);
        warn!("Model request failed: {}", err);
        let message = format!("Error: {}", err);
        self.ui_writer.show_error(&message);

        match &err {
            SessionError::Gateway(e) if e.is_connectivity() => self.rollback(),
            _ => self.history.push(Message::assistant(message)),
        }
    }

    /// Drop everything after the checkpoint. Before any tool ran that is
    /// the user's line itself; afterwards only the pending request.
    fn rollback(&mut self) {
        debug!("Rolling history back to {} turns", self.checkpoint);
        self.history.truncate(self.checkpoint);
    }

    /// Results folded so far survive later rollbacks.
    fn advance_checkpoint(&mut self) {
        self.checkpoint = self.history.len();
    }

    fn set_working_dir(&mut self, dir: PathBuf) {
        info!("Working directory: {}", dir.display());
        self.working_dir = dir;
        self.refresh_system_prompt();
    }

    fn refresh_system_prompt(&mut self) {
        self.system_prompt = build_system_prompt(
            self.options.custom_prompt.as_deref(),
            &self.working_dir,
            self.options.mode,
            &self.catalog,
        );
    }
}

/// Fill a placeholder `pid` argument (e.g. `"$LAST_PID"`) with the pid an
/// earlier step reported; numeric strings become integers.
fn substitute_pid(arguments: &mut ToolArgs, last_pid: Option<u32>) {
    let Some(value) = arguments.get_mut("pid") else {
        return;
    };
    if value.is_u64() {
        return;
    }
    if let Some(parsed) = value.as_str().and_then(|s| s.trim().parse::<u64>().ok()) {
        *value = Value::from(parsed);
        return;
    }
    if let Some(pid) = last_pid {
        debug!("Substituting captured pid {} for {}", pid, value);
        *value = Value::from(pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_substitute_pid_placeholder() {
        let mut a = args(json!({"pid": "$LAST_PID"}));
        substitute_pid(&mut a, Some(4242));
        assert_eq!(a["pid"], json!(4242));
    }

    #[test]
    fn test_substitute_pid_keeps_explicit_values() {
        let mut a = args(json!({"pid": 17}));
        substitute_pid(&mut a, Some(4242));
        assert_eq!(a["pid"], json!(17));

        let mut a = args(json!({"pid": "18"}));
        substitute_pid(&mut a, Some(4242));
        assert_eq!(a["pid"], json!(18));
    }

    #[test]
    fn test_substitute_pid_without_capture_leaves_placeholder() {
        let mut a = args(json!({"pid": "<captured>"}));
        substitute_pid(&mut a, None);
        assert_eq!(a["pid"], json!("<captured>"));

        let mut a = args(json!({"command": "ls"}));
        substitute_pid(&mut a, Some(1));
        assert!(!a.contains_key("pid"));
    }
}
