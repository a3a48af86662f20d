//! Error types for Sesskeep

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema load error: {0}")]
    SchemaLoad(String),

    #[error("Connection error: {0}")]
    Connection(String),

    // Per-operation errors
    #[error("Session not found: {id}")]
    NotFound { id: String },

    #[error("Failed to deserialize session {id}: {reason}")]
    Deserialization { id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
