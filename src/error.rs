//! Error types for dispo-mail.
//!
//! Only [`ValidationError`] and [`ConfigError`] ever reach a caller. Provider
//! failures are folded into soft outcomes at the adapter boundary.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("HTTP client could not be built: {0}")]
    HttpClient(String),
}

/// Errors raised while talking to a mailbox provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("{provider} answered with status {status}")]
    Status { provider: String, status: u16 },

    #[error("Malformed response from {provider}: {reason}")]
    Malformed { provider: String, reason: String },
}

impl ProviderError {
    /// Whether the failure happened before any response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    pub(crate) fn malformed(provider: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }
}

/// Rejected user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter an email address")]
    EmptyAddress,

    #[error("Not a valid email address: {0}")]
    InvalidAddress(String),
}

/// Result type alias for dispo-mail.
pub type Result<T> = std::result::Result<T, Error>;
