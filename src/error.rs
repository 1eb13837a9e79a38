//! Error types for the asset VFS

use libsqlite3_sys as ffi;
use std::os::raw::c_int;
use thiserror::Error;

/// Asset VFS result type
pub type Result<T> = std::result::Result<T, AssetVfsError>;

/// Asset VFS errors
#[derive(Error, Debug)]
pub enum AssetVfsError {
    /// No asset exists under the resolved name
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Underlying read or seek failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Open request rejected (write intent, temp file, journal, ...)
    #[error("Cannot open {path}: {reason}")]
    CannotOpen { path: String, reason: String },

    /// Mutating operation on read-only asset storage
    #[error("Unsupported operation on read-only assets: {0}")]
    Unsupported(&'static str),

    /// SQLite rejected the VFS, or the name is taken
    #[error("VFS registration failed for '{name}': {reason}")]
    Registration { name: String, reason: String },

    /// Logical path does not map to a valid asset name
    #[error("Invalid asset path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Operation on an asset handle after close
    #[error("Asset handle already closed: {0}")]
    Closed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),

    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A built-in validation pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl AssetVfsError {
    pub(crate) fn registration(name: &str, reason: impl Into<String>) -> Self {
        AssetVfsError::Registration {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn cannot_open(path: &str, reason: impl Into<String>) -> Self {
        AssetVfsError::CannotOpen {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// SQLite result code reported to the engine for this error
    pub fn sqlite_code(&self) -> c_int {
        match self {
            AssetVfsError::NotFound(_)
            | AssetVfsError::CannotOpen { .. }
            | AssetVfsError::InvalidPath { .. } => ffi::SQLITE_CANTOPEN,
            AssetVfsError::Io(_) => ffi::SQLITE_IOERR_READ,
            AssetVfsError::Unsupported(_) => ffi::SQLITE_READONLY,
            AssetVfsError::Closed(_) => ffi::SQLITE_MISUSE,
            AssetVfsError::Registration { .. }
            | AssetVfsError::InvalidConfig(_)
            | AssetVfsError::Toml(_)
            | AssetVfsError::Sqlite(_)
            | AssetVfsError::Pattern(_) => ffi::SQLITE_ERROR,
        }
    }
}
