//! Utility functions for Alexia CLI.

use alexia_config::{Config, ConfigOverrides};
use anyhow::Result;

use crate::cli_args::Cli;

const LOG_TARGETS: [&str; 6] = [
    "alexia",
    "alexia_cli",
    "alexia_core",
    "alexia_config",
    "alexia_execution",
    "alexia_providers",
];

/// Load configuration with CLI argument overrides applied.
pub fn load_config_with_cli_overrides(cli: &Cli) -> Result<Config> {
    let overrides = ConfigOverrides {
        host: cli.host.clone(),
        model: cli.model.clone(),
        system_prompt: cli.system.clone(),
        quiet: cli.quiet,
        plan_mode: cli.plan,
    };
    Config::load_with_overrides(cli.config.as_deref(), overrides)
}

/// Default filter directives for the alexia crates at `level`.
fn default_directives(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize logging based on CLI verbosity settings. `RUST_LOG` wins
/// when set. Logs go to stderr so they never mix with the conversation.
pub fn initialize_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use alexia_config::SessionMode;
    use clap::Parser;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_directives() {
        let directives = default_directives("debug");
        assert!(directives.starts_with("alexia=debug,"));
        assert!(directives.contains("alexia_providers=debug"));
    }

    #[test]
    #[serial]
    fn test_flags_override_config_file() {
        std::env::remove_var("OLLAMA_HOST");
        std::env::remove_var("OLLAMA_MODEL");

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("alexia.toml");
        std::fs::write(
            &path,
            "[ollama]\nhost = \"http://file-host:11434\"\nmodel = \"from-file\"\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "alexia",
            "--config",
            path.to_str().unwrap(),
            "--model",
            "from-flag",
            "--plan",
        ]);
        let config = load_config_with_cli_overrides(&cli).unwrap();

        assert_eq!(config.ollama.host, "http://file-host:11434");
        assert_eq!(config.ollama.model.as_deref(), Some("from-flag"));
        assert_eq!(config.agent.mode, SessionMode::Plan);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_config_is_an_error() {
        let cli = Cli::parse_from(["alexia", "--config", "/definitely/not/here.toml"]);
        assert!(load_config_with_cli_overrides(&cli).is_err());
    }
}
