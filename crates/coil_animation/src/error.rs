//! Animation error types

use thiserror::Error;

/// Rejected spring configuration values
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Tension is negative, NaN or infinite
    #[error("Spring tension must be finite and non-negative, got {0}")]
    InvalidTension(f64),

    /// Friction is negative, NaN or infinite
    #[error("Spring friction must be finite and non-negative, got {0}")]
    InvalidFriction(f64),
}

/// Errors raised while loading system settings
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to parse TOML settings
    #[error("Failed to parse TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// Failed to parse JSON settings
    #[error("Failed to parse JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    /// Default spring is not a usable configuration
    #[error("Invalid spring configuration: {0}")]
    Config(#[from] ConfigError),

    /// Simulation timestep must be positive and finite
    #[error("Simulation timestep must be positive, got {0}")]
    InvalidTimestep(f64),

    /// A rest threshold is negative or not finite
    #[error("Rest threshold `{name}` must be finite and non-negative, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;
