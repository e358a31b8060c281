//! Error types for the matchup matrix

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the matchup matrix
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication token not configured. Please set the {0} environment variable.")]
    MissingToken(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    // Transport errors
    #[error("Authentication required. Please check your API token.")]
    Unauthorized,

    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),

    // Data errors
    #[error("No record found for archetype: {0}")]
    NoRecord(String),

    #[error("Failed to fetch some win rates:\n{}", .0.join("\n"))]
    PartialFailure(Vec<String>),

    #[error("Snapshot cache error: {0}")]
    Snapshot(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// "No record found" is the expected sparse-data outcome, not a failure
    pub fn is_sparse_data(&self) -> bool {
        matches!(self, Error::NoRecord(_))
    }

    /// Check if this error comes from missing or invalid configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Config(_) | Error::MissingToken(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
