//! Error types for jenkins-deck
//!
//! All modules use `DeckResult<T>` as their return type. `DeckError` is
//! `Clone` so a single failed in-flight request can be handed to every
//! caller waiting on it.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for jenkins-deck operations
pub type DeckResult<T> = Result<T, DeckError>;

/// All errors that can occur in jenkins-deck
#[derive(Error, Debug, Clone)]
pub enum DeckError {
    // Configuration errors
    #[error("Jenkins server is not configured")]
    NotConfigured,

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Unknown configuration key: {0}")]
    ConfigKey(String),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    // Remote errors
    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Jenkins returned HTTP {code} for {url}")]
    Status { code: u16, url: String },

    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    // Domain errors
    #[error("Invalid job path: {0}")]
    JobPath(String),

    #[error("Invalid parameter '{0}', expected KEY=VALUE")]
    InvalidParameter(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(String),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl DeckError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source: Arc::new(source),
        }
    }

    /// Create a transport-level HTTP error
    pub fn http(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Http {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a response decoding error
    pub fn decode(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if the server has not been configured yet
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }

    /// Check if the HTTP status was a 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { code: 404, .. })
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } => true,
            Self::Status { code, .. } => *code >= 500 || *code == 429,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotConfigured => Some("Run: deck config init --url <jenkins-url>"),
            Self::Status { code: 401, .. } | Self::Status { code: 403, .. } => {
                Some("Check server.username and server.api_token in your config")
            }
            Self::Http { .. } => Some("Check that the Jenkins URL is reachable"),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DeckError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl From<toml::de::Error> for DeckError {
    fn from(e: toml::de::Error) -> Self {
        Self::TomlParse(e.to_string())
    }
}

impl From<toml::ser::Error> for DeckError {
    fn from(e: toml::ser::Error) -> Self {
        Self::TomlSerialize(e.to_string())
    }
}

impl From<toml_edit::TomlError> for DeckError {
    fn from(e: toml_edit::TomlError) -> Self {
        Self::TomlParse(e.to_string())
    }
}
