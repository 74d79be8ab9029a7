use alexia_config::SessionMode;
use std::path::Path;

use crate::catalog::ToolCatalog;

const DEFAULT_PREAMBLE: &str =
"You are Alexia, a helpful AI assistant running in the user's terminal. You answer questions directly and concisely.

You can act on the user's machine through tools. Use a tool only when the request needs it; otherwise answer in plain text.
When a tool returns a result, use it to decide your next step. If a tool reports an error, explain it or try a different approach.
When the task is done, reply with a short plain-text summary and no JSON.";

const PLAN_MODE_INSTRUCTIONS: &str =
"You create a sequence of tool calls to fulfill the user's request. You must choose tools from the 'Available Tools' list.
Respond ONLY with a single JSON object with a 'plan' key, which is an array of tool call objects. Each object in the array must be a valid tool call with 'tool_name' and 'arguments'.
To refer to the PID reported by an earlier 'start_process' step, use the string \"$LAST_PID\" as the 'pid' argument.
If the request needs no tools, answer in plain text instead.";

/// Full system prompt: preamble (or the user's replacement), the working
/// directory, mode instructions, and the tool listing.
pub fn build_system_prompt(
    custom: Option<&str>,
    working_dir: &Path,
    mode: SessionMode,
    catalog: &ToolCatalog,
) -> String {
    let mut sections = vec![
        custom
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_PREAMBLE)
            .to_string(),
        format!(
            "The user's current working directory is '{}'. Relative paths are resolved against it.",
            working_dir.display()
        ),
    ];
    if mode == SessionMode::Plan {
        sections.push(PLAN_MODE_INSTRUCTIONS.to_string());
    }
    let tools = catalog.tool_prompt();
    if !tools.is_empty() {
        sections.push(tools);
    }
    sections.join("\n\n")
}

/// User turn carrying a tool's result back to the model.
pub fn tool_result_message(tool_name: &str, result: &str) -> String {
    format!("The tool '{}' returned:\n{}", tool_name, result)
}

/// Closing request after every plan step succeeded.
pub fn plan_summary_prompt(last_result: &str) -> String {
    format!(
        "The execution plan is complete. Based on the history and the final tool result below, \
         provide a concise, natural-language summary to the user about what was accomplished.\n\n\
         Final Information:\n---\n{}\n---",
        last_result
    )
}
