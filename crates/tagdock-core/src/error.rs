//! Error types for tagdock.
//!
//! Errors are grouped by concern so the binary can report clear, actionable
//! messages: configuration, tag editing, and captioning.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for tagdock operations.
#[derive(Error, Debug)]
pub enum TagdockError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tag editing errors
    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    /// Captioning errors
    #[error("Captioning error: {0}")]
    Caption(#[from] CaptionError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while editing the tags of an image.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EditorError {
    /// A tag row outside the active list was addressed
    #[error("Tag row {row} out of range (list has {len} tags)")]
    RowOutOfRange { row: usize, len: usize },

    /// An image row outside the collection was addressed
    #[error("Image row {row} out of range (collection has {len} images)")]
    ImageOutOfRange { row: usize, len: usize },

    /// A tag operation needs an active image but none is loaded
    #[error("No image is loaded in the tag editor")]
    NoActiveImage,

    /// Counting tokens for the budget label failed
    #[error("Token count failed: {0}")]
    Tokenizer(#[from] TokenizerError),
}

/// A tokenizer failed to load, encode or decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TokenizerError(pub String);

/// Captioning errors, split by the stage that failed.
#[derive(Error, Debug)]
pub enum CaptionError {
    /// The requested model settings cannot work; reported before any work starts
    #[error("{0}")]
    Configuration(String),

    /// Model files missing or failed to load
    #[error("Model error: {message}")]
    Model { message: String },

    /// Tokenizer failed to load, encode or decode
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    /// Input image could not be read
    #[error("Image error for {path}: {message}")]
    Image { path: PathBuf, message: String },

    /// Generation failed mid-run
    #[error("Inference failed: {message}")]
    Inference { message: String },
}

/// Convenience type alias for tagdock results.
pub type Result<T> = std::result::Result<T, TagdockError>;

/// Convenience type alias for captioning results.
pub type CaptionResult<T> = std::result::Result<T, CaptionError>;
