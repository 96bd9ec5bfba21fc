//! Error Types
//!
//! Error handling for session and platform operations.

use thiserror::Error;

/// Errors surfaced by the session core or its platform collaborators
#[derive(Error, Debug)]
pub enum FpqaError {
    // Sensor errors
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Sensor request failed: {0}")]
    SensorRequest(String),

    // Platform collaborator errors
    #[error("Broadcast receiver registration failed: {0}")]
    ReceiverRegistration(String),

    #[error("Platform call failed: {0}")]
    Platform(String),

    // Configuration errors
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidConfig { key: String, value: String },

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for session operations
pub type FpqaResult<T> = Result<T, FpqaError>;
