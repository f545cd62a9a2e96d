//! Centralized error types for Meteopin.
//!
//! Every failure is scoped to the operation that raised it. Nothing here is
//! fatal to the application and nothing is retried automatically; use
//! `user_message()` for the text shown to the user.

use std::time::Duration;

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Map error: {0}")]
    Map(#[from] MapInitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Validation(e) => e.user_message(),
            AppError::Network(e) => e.user_message(),
            AppError::Persistence(e) => e.user_message(),
            AppError::Map(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// User-correctable input errors. Raised before any state is mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid coordinates: latitude {latitude:?}, longitude {longitude:?}")]
    InvalidCoordinates { latitude: String, longitude: String },

    #[error("A widget already exists near {latitude}, {longitude}")]
    DuplicateWidget { latitude: f64, longitude: f64 },
}

impl ValidationError {
    pub fn invalid(latitude: impl ToString, longitude: impl ToString) -> Self {
        ValidationError::InvalidCoordinates {
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::InvalidCoordinates { .. } => {
                "Please enter valid coordinates: latitude -90 to 90, longitude -180 to 180."
            }
            ValidationError::DuplicateWidget { .. } => {
                "A widget with these coordinates already exists."
            }
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Could not fetch weather data. Check the coordinates and your internet connection."
            }
            NetworkError::Timeout => "The weather request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => {
                "Could not fetch weather data. Check the coordinates and your internet connection."
            }
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response from the weather service."
            }
        }
    }
}

/// Local storage errors. Logged and swallowed by the widget store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to serialize widgets: {0}")]
    Serialize(String),

    #[error("Failed to deserialize widgets: {0}")]
    Deserialize(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl PersistenceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            PersistenceError::Serialize(_) | PersistenceError::Storage(_) => {
                "Widgets could not be saved. Changes will be lost on restart."
            }
            PersistenceError::Deserialize(_) => "Saved widgets were unreadable and have been reset.",
        }
    }
}

/// Map initialization errors. The dashboard degrades to list-only mode.
#[derive(Debug, Clone, Error)]
pub enum MapInitError {
    #[error("Map did not become ready within {0:?}")]
    Timeout(Duration),

    #[error("Map creation failed: {0}")]
    Failed(String),
}

impl MapInitError {
    pub fn user_message(&self) -> &'static str {
        match self {
            MapInitError::Timeout(_) => "Failed to load the map. The app runs in list-only mode.",
            MapInitError::Failed(_) => "Map creation failed. The app runs in list-only mode.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
