use alexia_providers::GatewayError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("tool with name '{0}' is already registered")]
    DuplicateName(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("the model requested an unknown tool: '{0}'")]
    UnknownTool(String),

    #[error("cannot change directory to '{path}': {reason}")]
    Directory { path: PathBuf, reason: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl SessionError {
    pub fn directory(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Directory {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
