//! Small helpers shared by the tools and the session loop:
//! path resolution, text truncation, and scraping values out of tool output.

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Resolve a user- or model-supplied path: expand `~`, and interpret
/// relative paths against `base` (the session's working directory).
pub fn resolve_path(base: Option<&Path>, input: &str) -> PathBuf {
    let expanded = shellexpand::tilde(input.trim());
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match base {
        Some(base) => base.join(path),
        None => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}

/// Resolve `input` to an existing directory, canonicalized.
pub fn resolve_directory(base: Option<&Path>, input: &str) -> Result<PathBuf, String> {
    let target = resolve_path(base, input);
    if !target.exists() {
        return Err("no such directory".to_string());
    }
    if !target.is_dir() {
        return Err("not a directory".to_string());
    }
    target.canonicalize().map_err(|e| e.to_string())
}

/// Truncate to at most `max_chars` characters, appending a marker when
/// anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!(
            "{}\n\n[Content truncated at {} characters]",
            &s[..byte_index],
            max_chars
        ),
        None => s.to_string(),
    }
}

/// Elements whose whole subtree is not page text.
const SKIPPED_ELEMENTS: [&str; 5] = ["head", "script", "style", "noscript", "svg"];

/// Extract the readable text from an HTML document, one text node per line.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();
    collect_text(document.root_element(), &mut lines);
    lines.join("\n")
}

fn collect_text(element: ElementRef, lines: &mut Vec<String>) {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, lines);
                }
            }
            _ => {}
        }
    }
}

/// Find the process id announced by `start_process` (`PID: <n>`).
pub fn extract_pid(text: &str) -> Option<u32> {
    static PID: OnceLock<Regex> = OnceLock::new();
    let re = PID.get_or_init(|| Regex::new(r"PID:\s*(\d+)").expect("static regex"));
    re.captures(text)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
