use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Startup-stage configuration failures. Raised before any service client exists.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse secrets file {}: {source}", .path.display())]
    Secrets {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid translate credential from {origin}: {reason}")]
    InvalidCredential { origin: String, reason: String },
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("vector index '{index}' was not ready after {waited:?}")]
    NotReady { index: String, waited: Duration },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
