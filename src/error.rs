// SPDX-License-Identifier: MIT

//! Error types for Platescan

use thiserror::Error;

/// Result type alias for Platescan operations
pub type Result<T> = std::result::Result<T, PlatescanError>;

/// Platescan error types
#[derive(Error, Debug)]
pub enum PlatescanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Recognition service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Malformed recognition response: {0}")]
    InvalidResponse(String),

    #[error("No image staged for analysis")]
    NoStagedImage,

    #[error("An analysis is already in progress")]
    AnalysisInFlight,
}
