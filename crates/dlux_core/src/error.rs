use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Unified error type for dlux_core operations
#[derive(Debug, Error)]
pub enum CollabError {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // Config errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    // Enumerated values coming from the UI or transport
    #[error("Invalid file type: '{0}'. Expected one of: local, collaborative, temp")]
    InvalidFileType(String),

    #[error("Invalid connection status: '{0}'")]
    InvalidConnectionStatus(String),

    #[error("Invalid permission level: '{0}'")]
    InvalidPermissionLevel(String),

    // Save pipeline
    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("No document is open")]
    NoDocument,
}

/// Result type alias for dlux_core operations
pub type Result<T> = std::result::Result<T, CollabError>;

/// A serializable representation of CollabError for IPC (e.g., a JS bridge)
#[derive(Debug, Clone, Serialize)]
pub struct SerializableError {
    /// Error kind/variant name
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// Associated path (if applicable)
    pub path: Option<PathBuf>,
}

impl From<&CollabError> for SerializableError {
    fn from(err: &CollabError) -> Self {
        let kind = match err {
            CollabError::Io(_) => "Io",
            CollabError::FileRead { .. } => "FileRead",
            CollabError::FileWrite { .. } => "FileWrite",
            CollabError::ConfigParse(_) => "ConfigParse",
            CollabError::ConfigSerialize(_) => "ConfigSerialize",
            CollabError::InvalidFileType(_) => "InvalidFileType",
            CollabError::InvalidConnectionStatus(_) => "InvalidConnectionStatus",
            CollabError::InvalidPermissionLevel(_) => "InvalidPermissionLevel",
            CollabError::SaveFailed(_) => "SaveFailed",
            CollabError::NoDocument => "NoDocument",
        }
        .to_string();

        let path = match err {
            CollabError::FileRead { path, .. } => Some(path.clone()),
            CollabError::FileWrite { path, .. } => Some(path.clone()),
            _ => None,
        };

        Self {
            kind,
            message: err.to_string(),
            path,
        }
    }
}

impl From<CollabError> for SerializableError {
    fn from(err: CollabError) -> Self {
        SerializableError::from(&err)
    }
}

impl CollabError {
    /// Convert to a serializable representation for IPC
    pub fn to_serializable(&self) -> SerializableError {
        SerializableError::from(self)
    }
}
