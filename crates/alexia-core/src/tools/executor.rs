//! Context handed to every tool invocation.

use alexia_execution::{ProcessControl, DEFAULT_SHELL_TIMEOUT};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::utils::resolve_path;

/// Limits the tools run under.
#[derive(Debug, Clone, Copy)]
pub struct ToolSettings {
    pub shell_timeout: Duration,
    /// How long `start_process` waits before reporting initial output.
    pub start_output_wait: Duration,
    pub url_timeout: Duration,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            shell_timeout: DEFAULT_SHELL_TIMEOUT,
            start_output_wait: Duration::from_secs(2),
            url_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared state a tool may use. Owned, so a tool can run on its own task.
#[derive(Clone)]
pub struct ToolContext {
    /// Set only for tools that declare they need it.
    pub working_dir: Option<PathBuf>,
    pub processes: Arc<dyn ProcessControl>,
    pub http: reqwest::Client,
    pub settings: ToolSettings,
}

impl ToolContext {
    pub fn new(processes: Arc<dyn ProcessControl>) -> Self {
        Self {
            working_dir: None,
            processes,
            http: reqwest::Client::new(),
            settings: ToolSettings::default(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_settings(mut self, settings: ToolSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Resolve a path argument against the injected working directory.
    pub fn resolve(&self, input: &str) -> PathBuf {
        resolve_path(self.working_dir.as_deref(), input)
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}
