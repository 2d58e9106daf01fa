//! Error types for the metal price tracker

use thiserror::Error;

/// Errors that can occur when fetching prices from a provider
///
/// None of these escape a refresh pass: the fallback chain turns every one of
/// them into "try the next provider".
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} returned HTTP {status}")]
    Transport { provider: &'static str, status: u16 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err)
        }
    }
}

impl ProviderError {
    /// Creates an InvalidResponse error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// True for failures below the response body: connection, status, timeout
    pub fn is_transport(&self) -> bool {
        !self.is_parse()
    }

    /// True when the provider answered but the body could not be used
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::InvalidResponse(_))
    }
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for `PriceConfig`
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range or malformed
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    /// Creates an InvalidValue error
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while building a tracker
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration was rejected by `PriceConfig::validate`
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The shared HTTP client could not be built
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
