use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Config files consulted, in order, when no explicit path is given.
const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "./alexia.toml",
    "~/.config/alexia/config.toml",
    "~/.alexia.toml",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Connection settings for the Ollama backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub model: Option<String>,
    pub request_timeout_seconds: u64,
    pub health_timeout_seconds: u64,
    pub models_timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: None,
            request_timeout_seconds: 120,
            health_timeout_seconds: 5,
            models_timeout_seconds: 10,
        }
    }
}

/// How the session asks the model to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Free conversation; the model may call one tool at a time.
    #[default]
    Conversational,
    /// The model is asked for a complete `{"plan": [...]}` up front.
    Plan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub mode: SessionMode,
    /// Custom system prompt: literal text, or a path to a file holding it.
    pub system_prompt: Option<String>,
    pub max_tool_iterations: usize,
    pub shell_timeout_seconds: u64,
    pub stop_grace_seconds: u64,
    pub start_output_wait_seconds: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::Conversational,
            system_prompt: None,
            max_tool_iterations: 10,
            shell_timeout_seconds: 300,
            stop_grace_seconds: 5,
            start_output_wait_seconds: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub quiet: bool,
}

/// Values supplied on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub quiet: bool,
    pub plan_mode: bool,
}

impl Config {
    /// Load from `config_path`, or from the first default location that
    /// exists. Falls back to defaults when no file is found.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path_to_load = match config_path {
            Some(path) => {
                let expanded = shellexpand::tilde(path).to_string();
                if !Path::new(&expanded).exists() {
                    anyhow::bail!("Config file not found: {}", expanded);
                }
                Some(PathBuf::from(expanded))
            }
            None => Self::find_default_config(),
        };

        match path_to_load {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                let config_content = std::fs::read_to_string(&path)?;
                let config: Config = toml::from_str(&config_content).map_err(|e| {
                    anyhow::anyhow!("Invalid config file {}: {}", path.display(), e)
                })?;
                Ok(config)
            }
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn find_default_config() -> Option<PathBuf> {
        DEFAULT_CONFIG_PATHS.iter().find_map(|path| {
            let expanded_path = shellexpand::tilde(path);
            let candidate = Path::new(expanded_path.as_ref());
            if candidate.exists() {
                Some(candidate.to_path_buf())
            } else {
                None
            }
        })
    }

    /// Load and layer: CLI flags > environment > file > defaults.
    pub fn load_with_overrides(config_path: Option<&str>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = Self::load(config_path)?;
        config.apply_env();

        if let Some(host) = overrides.host {
            config.ollama.host = host;
        }
        if let Some(model) = overrides.model {
            config.ollama.model = Some(model);
        }
        if let Some(prompt) = overrides.system_prompt {
            config.agent.system_prompt = Some(prompt);
        }
        if overrides.quiet {
            config.ui.quiet = true;
        }
        if overrides.plan_mode {
            config.agent.mode = SessionMode::Plan;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply `OLLAMA_HOST` and `OLLAMA_MODEL`, ignoring empty values.
    pub fn apply_env(&mut self) {
        if let Some(host) = non_empty_env("OLLAMA_HOST") {
            self.ollama.host = host;
        }
        if let Some(model) = non_empty_env("OLLAMA_MODEL") {
            self.ollama.model = Some(model);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ollama.host.trim().is_empty() {
            anyhow::bail!("Ollama host must not be empty");
        }
        let timeouts = [
            ("ollama.request_timeout_seconds", self.ollama.request_timeout_seconds),
            ("ollama.health_timeout_seconds", self.ollama.health_timeout_seconds),
            ("ollama.models_timeout_seconds", self.ollama.models_timeout_seconds),
            ("agent.shell_timeout_seconds", self.agent.shell_timeout_seconds),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", name);
            }
        }
        if self.agent.max_tool_iterations == 0 {
            anyhow::bail!("agent.max_tool_iterations must be greater than zero");
        }
        Ok(())
    }

    /// Host with a scheme, so `localhost:11434` style values still work.
    pub fn normalized_host(&self) -> String {
        let host = self.ollama.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        }
    }

    /// The custom system prompt text. A value naming an existing file is
    /// replaced by that file's contents.
    pub fn resolve_system_prompt(&self) -> Result<Option<String>> {
        let Some(value) = &self.agent.system_prompt else {
            return Ok(None);
        };

        let expanded = shellexpand::tilde(value);
        let path = Path::new(expanded.as_ref());
        if path.is_file() {
            let text = std::fs::read_to_string(path).map_err(|e| {
                anyhow::anyhow!("Could not read system prompt file {}: {}", path.display(), e)
            })?;
            return Ok(Some(text.trim().to_string()));
        }
        Ok(Some(value.clone()))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
