use thiserror::Error;

/// Failures surfaced by a [`crate::ModelGateway`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend could not be reached, or the request timed out.
    #[error("could not reach the model backend: {0}")]
    Connectivity(String),

    /// The backend answered, but reported an error (in-band or via status).
    #[error("model backend error: {0}")]
    Protocol(String),

    /// A response line could not be decoded.
    #[error("malformed response from model backend: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Protocol(format!("HTTP {}: {}", status, e))
        } else {
            // connect errors, timeouts, and broken bodies all mean the
            // backend is not usable right now
            Self::Connectivity(e.to_string())
        }
    }
}
