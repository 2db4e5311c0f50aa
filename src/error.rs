//! Error types for profile mutations and the pending action queue.

use crate::types::ActionKind;
use thiserror::Error;

/// Main error type for client operations.
#[derive(Debug, Error)]
pub enum EngageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid queue format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Queue storage is locked by another process")]
    Locked,

    #[error("Queue storage not initialized")]
    NotInitialized,

    #[error("Invalid numeric value for {property}: {value}")]
    InvalidNumber { property: String, value: String },

    #[error("Action {0} cannot be queued")]
    NotQueueable(ActionKind),

    #[error("{0} requires identify() to be called first")]
    NotIdentified(&'static str),

    #[error("Dispatcher unavailable: {0}")]
    DispatcherClosed(String),
}

impl From<serde_json::Error> for EngageError {
    fn from(e: serde_json::Error) -> Self {
        EngageError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for EngageError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        EngageError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for EngageError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        EngageError::Deserialization(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, EngageError>;
