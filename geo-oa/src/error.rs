//! Error types for OA index measurement.

use std::io;

/// Errors raised by measurement, file lookup and export
#[derive(Debug, thiserror::Error)]
pub enum GeoOaError {
    /// A ratio denominator or configuration value was out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Requested file is absent from every searched location
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(String),
    /// Failure propagated from the host environment
    #[error("Host error: {0}")]
    Host(String),
}

/// Result type for geo-oa operations
pub type Result<T> = std::result::Result<T, GeoOaError>;
