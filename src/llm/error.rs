use thiserror::Error;

/// Failure modes of a remote provider call.
///
/// Only [`ProviderError::UnknownProvider`] escapes the dispatcher; every
/// other variant triggers the local fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("provider '{0}' is not a remote provider")]
    NotRemote(String),

    #[error("no API key configured for {0}")]
    MissingApiKey(String),

    #[error("API request failed: {status} - {body}")]
    HttpStatus { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid JSON in response: {0}")]
    InvalidJson(String),
}

impl ProviderError {
    /// Whether the dispatcher should answer locally instead of failing.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::UnknownProvider(_))
    }

    /// Short machine-readable kind, used in the query log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownProvider(_) => "unknown_provider",
            Self::NotRemote(_) => "not_remote",
            Self::MissingApiKey(_) => "missing_api_key",
            Self::HttpStatus { .. } => "http_status",
            Self::Network(_) => "network",
            Self::InvalidJson(_) => "invalid_json",
        }
    }
}
