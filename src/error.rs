//! # Error Types
//!
//! Custom error types for Tello Teleop using `thiserror`.

use thiserror::Error;

/// Main error type for Tello Teleop
#[derive(Debug, Error)]
pub enum TeleopError {
    /// Session startup failed (connect / speed / stream calls refused)
    #[error("session setup failed: {0}")]
    Setup(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Input device errors (evdev scan or read)
    #[error("input device error: {0}")]
    Device(String),

    /// Vehicle link errors (UDP send/receive)
    #[error("vehicle link error: {0}")]
    Link(String),

    /// Flight log errors (serialization or rotation)
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tello Teleop
pub type Result<T> = std::result::Result<T, TeleopError>;
