//! Error types for voxchat

use thiserror::Error;

/// Result type alias for voxchat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voxchat client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio capture/playback/encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// The agent replied with a non-success HTTP status
    #[error("server error {status}: {body}")]
    ServerStatus {
        /// HTTP status code
        status: u16,
        /// Response body, read for diagnostics
        body: String,
    },

    /// A recording cycle is already uploading; new cycles are rejected
    /// until it resolves
    #[error("a recording cycle is already uploading")]
    Busy,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
