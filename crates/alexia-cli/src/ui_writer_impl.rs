use alexia_core::ui_writer::UiWriter;
use alexia_core::{ToolArgs, ToolInvocation};
use alexia_execution::SystemProcess;
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use termimad::MadSkin;

use crate::display::{format_arguments, format_process_table, format_workspace_path};

/// Tool results longer than this many lines are cut for display.
const MAX_RESULT_LINES: usize = 40;

/// Console implementation of UiWriter that prints to stdout
pub struct ConsoleUiWriter {
    quiet: bool,
    skin: MadSkin,
    spinner: Mutex<Option<ProgressBar>>,
    /// Set when the user pressed Ctrl-C at a confirmation prompt.
    interrupted: Arc<AtomicBool>,
}

impl ConsoleUiWriter {
    pub fn new(quiet: bool) -> Self {
        let mut skin = MadSkin::default();
        skin.bold.set_fg(termimad::crossterm::style::Color::Green);
        skin.italic.set_fg(termimad::crossterm::style::Color::Cyan);
        skin.headers[0].set_fg(termimad::crossterm::style::Color::Magenta);
        skin.headers[1].set_fg(termimad::crossterm::style::Color::Magenta);
        skin.code_block.set_fg(termimad::crossterm::style::Color::Yellow);
        skin.inline_code.set_fg(termimad::crossterm::style::Color::Yellow);

        Self {
            quiet,
            skin,
            spinner: Mutex::new(None),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag raised when a confirmation prompt was interrupted.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    fn lock_spinner(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.spinner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stop_spinner(&self) {
        if let Some(spinner) = self.lock_spinner().take() {
            spinner.finish_and_clear();
        }
    }

    fn rule(&self, title: &str, color: Color) {
        println!(
            "{}━━━ {} ━━━{}",
            SetForegroundColor(color),
            title,
            ResetColor
        );
    }

    /// Ask until the answer is `y` or `n`. Ctrl-C or end of input refuses.
    fn read_yes_no(&self, prompt: &str) -> bool {
        let text = format!("{} (y/n): ", prompt);
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(_) => return read_yes_no_stdin(&text),
        };

        loop {
            match editor.readline(&text) {
                Ok(line) => match line.trim().to_lowercase().as_str() {
                    "y" | "yes" => return true,
                    "n" | "no" => return false,
                    _ => println!(
                        "{}Invalid input. Please enter 'y' or 'n'.{}",
                        SetForegroundColor(Color::Red),
                        ResetColor
                    ),
                },
                Err(ReadlineError::Interrupted) => {
                    self.interrupted.store(true, Ordering::SeqCst);
                    return false;
                }
                Err(_) => return false,
            }
        }
    }
}

fn read_yes_no_stdin(prompt: &str) -> bool {
    print!("{}", prompt);
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        let trimmed = input.trim().to_lowercase();
        trimmed == "y" || trimmed == "yes"
    } else {
        false
    }
}

impl UiWriter for ConsoleUiWriter {
    fn show_tool_request(&self, tool_name: &str, arguments: &ToolArgs) {
        self.stop_spinner();
        println!();
        self.rule("Tool Execution Request", Color::Yellow);
        println!(
            "Tool: {}{}{}",
            SetForegroundColor(Color::Cyan),
            tool_name,
            ResetColor
        );
        println!("Arguments:\n{}", format_arguments(arguments));
        println!();
    }

    fn show_tool_result(&self, tool_name: &str, result: &str) {
        self.stop_spinner();
        let color = if result.trim_start().starts_with("Error:") {
            Color::Red
        } else {
            Color::Green
        };
        self.rule(&format!("Result: {}", tool_name), color);

        let lines: Vec<&str> = result.lines().collect();
        for line in lines.iter().take(MAX_RESULT_LINES) {
            println!("{}", line);
        }
        if lines.len() > MAX_RESULT_LINES {
            println!(
                "{}... ({} more lines){}",
                SetForegroundColor(Color::DarkGrey),
                lines.len() - MAX_RESULT_LINES,
                ResetColor
            );
        }
        println!();
    }

    fn show_plan(&self, steps: &[ToolInvocation]) {
        self.stop_spinner();
        println!();
        self.rule("Execution Plan", Color::Cyan);
        for (i, step) in steps.iter().enumerate() {
            let name = if step.tool_name.is_empty() {
                "unknown tool"
            } else {
                step.tool_name.as_str()
            };
            println!("  {}. Use `{}`", i + 1, name);
        }
        println!();
    }

    fn show_error(&self, message: &str) {
        self.stop_spinner();
        println!(
            "{}✗ {}{}",
            SetForegroundColor(Color::Red),
            message,
            ResetColor
        );
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.stop_spinner();
        self.read_yes_no(prompt)
    }

    fn show_cwd_change(&self, new_dir: &Path) {
        println!(
            "{}Working directory is now {}{}",
            SetForegroundColor(Color::Blue),
            format_workspace_path(new_dir),
            ResetColor
        );
    }

    fn show_answer(&self, text: &str) {
        self.stop_spinner();
        println!();
        print!("{}", self.skin.term_text(text));
        println!();
    }

    fn show_info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.stop_spinner();
        println!(
            "{}{}{}",
            SetForegroundColor(Color::DarkGrey),
            message,
            ResetColor
        );
    }

    fn show_process_table(&self, processes: &[SystemProcess]) {
        self.stop_spinner();
        self.rule("Processes", Color::Cyan);
        println!("{}", format_process_table(processes));
        println!();
    }

    fn show_output_line(&self, line: &str) {
        println!("{}", line);
    }

    fn show_thinking(&self, active: bool) {
        if !active {
            self.stop_spinner();
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.yellow} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Alexia is thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        if let Some(previous) = self.lock_spinner().replace(spinner) {
            previous.finish_and_clear();
        }
    }
}
