//! Error types for the ecohydro workspace

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EcohydroError {
    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Filesystem precondition errors
    #[error("Permission denied for {path}: {reason}")]
    PermissionDenied { path: PathBuf, reason: String },

    #[error("{path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Unable to read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Refusing to overwrite existing artifact {path}")]
    AlreadyExists { path: PathBuf },

    // Parameter errors
    #[error("Invalid value for {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Invalid CRS '{crs}': {reason}")]
    InvalidCrs { crs: String, reason: String },

    #[error("Invalid bounding box: {reason}")]
    InvalidBoundingBox { reason: String },

    #[error("CRS mismatch: expected {expected}, found {found}")]
    CrsMismatch { expected: String, found: String },

    // Vector layer errors
    #[error("Layer in {path} contains no features with geometry")]
    EmptyLayer { path: PathBuf },

    #[error("Layer named '{layer}' not found in {path}")]
    LayerNotFound { layer: String, path: PathBuf },

    #[error("No features identified by \"{filter}\" found in layer '{layer}' of {path}")]
    NoMatchingFeature {
        filter: String,
        layer: String,
        path: PathBuf,
    },

    // External tool errors
    #[error("Executable not found or not executable: {path}")]
    ExecutableNotFound { path: PathBuf },

    #[error("Command `{command}` failed (exit code {}): {stderr}", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    ExternalToolFailure {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    // Format errors
    #[error("Format error ({format}): {message}")]
    FormatError { format: String, message: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, EcohydroError>;
