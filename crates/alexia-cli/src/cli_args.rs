//! CLI argument parsing for Alexia.

use clap::Parser;

#[derive(Parser, Clone, Debug)]
#[command(name = "alexia")]
#[command(about = "A terminal chat client for local Ollama models, with confirmed tool use")]
#[command(version)]
#[command(after_help = "Example: alexia --model llama3:latest --system \"You are a helpful assistant.\"")]
pub struct Cli {
    /// Ollama host URL (default: $OLLAMA_HOST or http://localhost:11434)
    #[arg(long, value_name = "URL")]
    pub host: Option<String>,

    /// Model to chat with (default: $OLLAMA_MODEL)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Custom system prompt, as text or a path to a file holding it
    #[arg(long, value_name = "TEXT_OR_PATH")]
    pub system: Option<String>,

    /// Suppress the startup banner and informational messages
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<String>,

    /// Ask the model for a complete plan of tool calls up front
    #[arg(long)]
    pub plan: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// List the models available on the host and exit
    #[arg(long)]
    pub list_models: bool,
}
