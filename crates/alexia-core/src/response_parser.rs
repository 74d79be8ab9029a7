//! Classifies raw model output as a tool call, a plan, or a plain answer.
//!
//! Precedence:
//! 1. a ```json fence (tag matched case-insensitively): its body is decoded,
//!    running to the end of the text if the closing fence is missing
//! 2. otherwise the span from the first `{` to the last `}`
//!
//! A decoded object with a `plan` array of objects is a plan; failing that,
//! an object with a string `tool_name` is a single tool call. Anything else,
//! including text that does not decode, is a plain answer.

use serde_json::{Map, Value};
use tracing::debug;

use crate::tools::ToolArgs;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// A tool the model asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub arguments: ToolArgs,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, arguments: ToolArgs) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    ToolCall(ToolInvocation),
    Plan(Vec<ToolInvocation>),
}

/// `None` means the text is a plain answer.
pub fn parse(text: &str) -> Option<ParsedResponse> {
    let candidate = extract_candidate(text)?;
    let value: Value = match serde_json::from_str(candidate.trim()) {
        Ok(value) => value,
        Err(e) => {
            debug!("Model output is not a tool call: {}", e);
            return None;
        }
    };
    let object = value.as_object()?;

    if let Some(Value::Array(steps)) = object.get("plan") {
        return parse_plan(steps).map(ParsedResponse::Plan);
    }

    let tool_name = object.get("tool_name")?.as_str()?;
    let arguments = parse_arguments(object.get("arguments"))?;
    Some(ParsedResponse::ToolCall(ToolInvocation::new(tool_name, arguments)))
}

fn extract_candidate(text: &str) -> Option<&str> {
    // ASCII lowercasing keeps byte offsets aligned with `text`
    let lowered = text.to_ascii_lowercase();
    if let Some(open) = lowered.find(JSON_FENCE) {
        let body = &text[open + JSON_FENCE.len()..];
        return Some(match body.find(FENCE) {
            Some(close) => &body[..close],
            None => body,
        });
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_plan(steps: &[Value]) -> Option<Vec<ToolInvocation>> {
    steps
        .iter()
        .map(|step| {
            let step = step.as_object()?;
            // a step without a usable name surfaces later as an unknown tool
            let tool_name = step
                .get("tool_name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let arguments = parse_arguments(step.get("arguments"))?;
            Some(ToolInvocation::new(tool_name, arguments))
        })
        .collect()
}

fn parse_arguments(value: Option<&Value>) -> Option<ToolArgs> {
    match value {
        None | Some(Value::Null) => Some(Map::new()),
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: Value) -> ParsedResponse {
        ParsedResponse::ToolCall(ToolInvocation::new(
            name,
            args.as_object().cloned().unwrap(),
        ))
    }

    #[test]
    fn test_bare_object() {
        let text = r#"{"tool_name": "list_dir", "arguments": {"directory_path": "."}}"#;
        assert_eq!(parse(text), Some(call("list_dir", json!({"directory_path": "."}))));
    }

    #[test]
    fn test_fenced_object_inside_prose() {
        let text = "Sure, let me look.\n```json\n{\"tool_name\": \"read_file\", \"arguments\": {\"file_path\": \"a.txt\"}}\n```\nThat should do it {maybe}.";
        assert_eq!(parse(text), Some(call("read_file", json!({"file_path": "a.txt"}))));
    }

    #[test]
    fn test_fence_tag_is_case_insensitive() {
        let text = "```JSON\n{\"tool_name\": \"list_processes\"}\n```";
        assert_eq!(parse(text), Some(call("list_processes", json!({}))));
    }

    #[test]
    fn test_unterminated_fence_uses_rest_of_text() {
        let text = "```json\n{\"tool_name\": \"list_processes\", \"arguments\": null}";
        assert_eq!(parse(text), Some(call("list_processes", json!({}))));
    }

    #[test]
    fn test_broken_fence_does_not_fall_back_to_braces() {
        let text = "```json\nnot json\n```\n{\"tool_name\": \"list_dir\"}";
        assert_eq!(parse(text), None);
    }

    #[test]
    fn test_prose_around_bare_object() {
        let text = "I will run this: {\"tool_name\": \"execute_command\", \"arguments\": {\"command\": \"ls\"}} ok";
        assert_eq!(parse(text), Some(call("execute_command", json!({"command": "ls"}))));
    }

    #[test]
    fn test_plain_answers() {
        assert_eq!(parse("Hello! How can I help?"), None);
        assert_eq!(parse("} backwards {"), None);
        assert_eq!(parse("{not json}"), None);
        assert_eq!(parse(r#"{"answer": 42}"#), None);
        assert_eq!(parse(r#"{"tool_name": 7}"#), None);
        assert_eq!(parse("[1, 2, 3]"), None);
    }

    #[test]
    fn test_non_object_arguments_rejected() {
        assert_eq!(parse(r#"{"tool_name": "list_dir", "arguments": "."}"#), None);
    }

    #[test]
    fn test_plan() {
        let text = r#"{"plan": [
            {"tool_name": "start_process", "arguments": {"command": "python -m http.server 8000"}},
            {"tool_name": "stop_process", "arguments": {"pid": "<captured>"}}
        ]}"#;
        match parse(text) {
            Some(ParsedResponse::Plan(steps)) => {
                assert_eq!(steps.len(), 2);
                assert_eq!(steps[0].tool_name, "start_process");
                assert_eq!(steps[1].arguments["pid"], json!("<captured>"));
            }
            other => panic!("expected plan, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_takes_precedence_over_tool_name() {
        let text = r#"{"tool_name": "list_dir", "plan": [{"tool_name": "list_processes"}]}"#;
        assert!(matches!(parse(text), Some(ParsedResponse::Plan(steps)) if steps.len() == 1));
    }

    #[test]
    fn test_plan_with_non_object_step_rejected() {
        assert_eq!(parse(r#"{"plan": [{"tool_name": "list_dir"}, "oops"]}"#), None);
    }

    #[test]
    fn test_plan_step_without_name_kept_as_empty() {
        match parse(r#"{"plan": [{"arguments": {}}]}"#) {
            Some(ParsedResponse::Plan(steps)) => assert_eq!(steps[0].tool_name, ""),
            other => panic!("expected plan, got {:?}", other),
        }
    }
}
