//! Alexia CLI - terminal chat client for local Ollama models.

mod cli_args;
mod display;
mod interactive;
mod ui_writer_impl;
mod utils;

use alexia_config::Config;
use alexia_core::ui_writer::UiWriter;
use alexia_core::{Session, SessionOptions, ToolCatalog};
use alexia_execution::ProcessSupervisor;
use alexia_providers::{ModelGateway, OllamaGateway};
use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use cli_args::Cli;

use display::{format_models_table, print_banner};
use interactive::run_interactive;
use ui_writer_impl::ConsoleUiWriter;
use utils::{initialize_logging, load_config_with_cli_overrides};

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(cli.verbose);

    // Load configuration with CLI overrides
    let config = load_config_with_cli_overrides(&cli)?;
    let gateway = Arc::new(create_gateway(&config)?);

    if cli.list_models {
        let models = gateway.list_models().await?;
        println!("{}", format_models_table(&models));
        return Ok(());
    }

    let ui_writer = ConsoleUiWriter::new(config.ui.quiet);
    let working_dir = std::env::current_dir()?;
    if !config.ui.quiet {
        print_banner(config.ollama.model.as_deref(), gateway.host(), &working_dir);
    }

    ui_writer.show_info(&format!("Checking connection to Ollama at {}...", gateway.host()));
    if !gateway.check_health().await {
        bail!(
            "Could not connect to Ollama at {}. Please ensure it is running and accessible.",
            gateway.host()
        );
    }
    ui_writer.show_info("Connection successful.");

    let Some(model) = config.ollama.model.clone() else {
        bail!("No model specified. Please set the OLLAMA_MODEL environment variable or use the --model argument.");
    };
    check_model_installed(gateway.as_ref(), &model, &ui_writer).await;

    let supervisor = Arc::new(ProcessSupervisor::with_stop_grace(Duration::from_secs(
        config.agent.stop_grace_seconds,
    )));
    let options = SessionOptions::from_config(&config, model)?;
    info!("Starting session in {:?} mode", options.mode);

    let interrupted = ui_writer.interrupt_flag();
    let session = Session::new(
        gateway,
        supervisor,
        Arc::new(ToolCatalog::with_default_tools()),
        ui_writer,
        options,
    );

    run_interactive(session, interrupted, config.ui.quiet).await
}

// --- Helper functions ---

fn create_gateway(config: &Config) -> Result<OllamaGateway> {
    let host = config.normalized_host();
    debug!("Using Ollama host {}", host);
    let gateway = OllamaGateway::new(&host)?.with_timeouts(
        Duration::from_secs(config.ollama.request_timeout_seconds),
        Duration::from_secs(config.ollama.health_timeout_seconds),
        Duration::from_secs(config.ollama.models_timeout_seconds),
    );
    Ok(gateway)
}

/// Warn, without failing, when the host does not list `model`.
async fn check_model_installed(gateway: &dyn ModelGateway, model: &str, ui_writer: &impl UiWriter) {
    match gateway.list_models().await {
        Ok(models) if !models.iter().any(|m| model_matches(&m.name, model)) => {
            warn!("Model '{}' is not listed by the host", model);
            ui_writer.show_error(&format!(
                "Model '{}' is not installed on this host. Run with --list-models to see what is available.",
                model
            ));
        }
        Ok(_) => {}
        Err(e) => debug!("Could not list models: {}", e),
    }
}

/// Ollama lists untagged models under `:latest`.
fn model_matches(listed: &str, requested: &str) -> bool {
    listed == requested || listed.strip_suffix(":latest") == Some(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_matches() {
        assert!(model_matches("llama3:latest", "llama3"));
        assert!(model_matches("llama3:latest", "llama3:latest"));
        assert!(model_matches("gemma3n:e4b", "gemma3n:e4b"));
        assert!(!model_matches("gemma3n:e4b", "gemma3n"));
    }
}
