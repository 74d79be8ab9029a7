use alexia_execution::SystemProcess;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::response_parser::ToolInvocation;
use crate::tools::ToolArgs;

/// Interface for UI output operations
/// This trait abstracts all UI operations so the session loop is not coupled
/// to a terminal. The console implementation lives in the CLI crate.
pub trait UiWriter: Send + Sync {
    /// Show a tool the model wants to run, with its arguments
    fn show_tool_request(&self, tool_name: &str, arguments: &ToolArgs);

    /// Show the text a tool returned
    fn show_tool_result(&self, tool_name: &str, result: &str);

    /// Show the steps of a proposed plan
    fn show_plan(&self, steps: &[ToolInvocation]);

    fn show_error(&self, message: &str);

    /// Ask a yes/no question
    fn confirm(&self, prompt: &str) -> bool;

    fn show_cwd_change(&self, new_dir: &Path);

    /// Render a final answer from the model
    fn show_answer(&self, text: &str);

    /// Status and progress notices
    fn show_info(&self, message: &str);

    fn show_process_table(&self, processes: &[SystemProcess]);

    /// One line of a shell escape's output, shown while the command runs.
    /// Default implementation does nothing.
    fn show_output_line(&self, _line: &str) {}

    /// Toggled around every model request.
    /// Default implementation does nothing.
    fn show_thinking(&self, _active: bool) {}
}

/// A no-op implementation for when UI output is not needed.
/// Every confirmation is granted.
pub struct NullUiWriter;

impl UiWriter for NullUiWriter {
    fn show_tool_request(&self, _tool_name: &str, _arguments: &ToolArgs) {}
    fn show_tool_result(&self, _tool_name: &str, _result: &str) {}
    fn show_plan(&self, _steps: &[ToolInvocation]) {}
    fn show_error(&self, _message: &str) {}
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
    fn show_cwd_change(&self, _new_dir: &Path) {}
    fn show_answer(&self, _text: &str) {}
    fn show_info(&self, _message: &str) {}
    fn show_process_table(&self, _processes: &[SystemProcess]) {}
}

/// Something a [`ScriptedUiWriter`] was asked to display.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ToolRequest { tool_name: String, arguments: ToolArgs },
    ToolResult { tool_name: String, result: String },
    Plan(Vec<ToolInvocation>),
    Error(String),
    Confirm { prompt: String, answer: bool },
    CwdChange(PathBuf),
    Answer(String),
    Info(String),
    ProcessTable(Vec<SystemProcess>),
    OutputLine(String),
}

/// Records everything shown and answers confirmations from a script.
/// Once the script runs out every confirmation is refused.
#[derive(Default)]
pub struct ScriptedUiWriter {
    answers: Mutex<VecDeque<bool>>,
    events: Mutex<Vec<UiEvent>>,
}

impl ScriptedUiWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Error(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn answers_shown(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Answer(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Names of tools whose results were shown, in order.
    pub fn executed_tools(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::ToolResult { tool_name, .. } => Some(tool_name),
                _ => None,
            })
            .collect()
    }

    pub fn tool_results(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::ToolResult { result, .. } => Some(result),
                _ => None,
            })
            .collect()
    }

    /// Lines streamed by shell escapes.
    pub fn output_lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::OutputLine(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn confirm_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, UiEvent::Confirm { .. }))
            .count()
    }

    fn record(&self, event: UiEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl UiWriter for ScriptedUiWriter {
    fn show_tool_request(&self, tool_name: &str, arguments: &ToolArgs) {
        self.record(UiEvent::ToolRequest {
            tool_name: tool_name.to_string(),
            arguments: arguments.clone(),
        });
    }

    fn show_tool_result(&self, tool_name: &str, result: &str) {
        self.record(UiEvent::ToolResult {
            tool_name: tool_name.to_string(),
            result: result.to_string(),
        });
    }

    fn show_plan(&self, steps: &[ToolInvocation]) {
        self.record(UiEvent::Plan(steps.to_vec()));
    }

    fn show_error(&self, message: &str) {
        self.record(UiEvent::Error(message.to_string()));
    }

    fn confirm(&self, prompt: &str) -> bool {
        let answer = self
            .answers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(false);
        self.record(UiEvent::Confirm {
            prompt: prompt.to_string(),
            answer,
        });
        answer
    }

    fn show_cwd_change(&self, new_dir: &Path) {
        self.record(UiEvent::CwdChange(new_dir.to_path_buf()));
    }

    fn show_answer(&self, text: &str) {
        self.record(UiEvent::Answer(text.to_string()));
    }

    fn show_info(&self, message: &str) {
        self.record(UiEvent::Info(message.to_string()));
    }

    fn show_process_table(&self, processes: &[SystemProcess]) {
        self.record(UiEvent::ProcessTable(processes.to_vec()));
    }

    fn show_output_line(&self, line: &str) {
        self.record(UiEvent::OutputLine(line.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_answers_then_refuse() {
        let ui = ScriptedUiWriter::with_answers([true, false]);
        assert!(ui.confirm("one"));
        assert!(!ui.confirm("two"));
        assert!(!ui.confirm("three"));
        assert_eq!(ui.confirm_count(), 3);
    }

    #[test]
    fn test_records_in_order() {
        let ui = ScriptedUiWriter::new();
        ui.show_info("starting");
        ui.show_error("bad");
        ui.show_answer("done");
        assert_eq!(
            ui.events(),
            vec![
                UiEvent::Info("starting".to_string()),
                UiEvent::Error("bad".to_string()),
                UiEvent::Answer("done".to_string()),
            ]
        );
        assert_eq!(ui.errors(), vec!["bad".to_string()]);
    }
}
