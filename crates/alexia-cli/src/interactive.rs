//! Interactive mode for Alexia CLI.

use alexia_core::ui_writer::UiWriter;
use alexia_core::{Flow, Session};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use crate::display::build_prompt;

/// Read lines until the user quits. Ctrl-C at any point, including while
/// the model is thinking or a tool is running, ends the session.
pub async fn run_interactive<W: UiWriter>(
    mut session: Session<W>,
    interrupted: Arc<AtomicBool>,
    quiet: bool,
) -> Result<()> {
    if !quiet {
        println!(
            "Starting chat session with {}. Type '/exit', '/quit', or press Ctrl+C to end. \
             Prefix a line with '!' to run a shell command.",
            session.model()
        );
        println!();
    }

    let config = Config::builder().auto_add_history(false).build();
    let mut rl = DefaultEditor::with_config(config)?;

    // Try to load history from a file in the user's home directory
    let history_file = dirs::home_dir().map(|mut path| {
        path.push(".alexia_history");
        path
    });
    if let Some(ref history_path) = history_file {
        let _ = rl.load_history(history_path);
    }

    loop {
        let prompt = build_prompt(session.working_dir());
        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                let flow = tokio::select! {
                    flow = session.handle_input(input) => flow,
                    _ = tokio::signal::ctrl_c() => {
                        debug!("Interrupted while handling input");
                        println!();
                        Flow::Exit
                    }
                };

                if flow == Flow::Exit || interrupted.load(Ordering::SeqCst) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                error!("Error: {:?}", err);
                break;
            }
        }
    }

    // Save history before exiting
    if let Some(ref history_path) = history_file {
        let _ = rl.save_history(history_path);
    }

    println!("Session ended. Goodbye!");
    Ok(())
}
