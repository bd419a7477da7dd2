//! Error types for Loci core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while higher-level code can use `anyhow` for
//! convenient error handling.

use thiserror::Error;

/// Result type alias using LociError
pub type Result<T> = std::result::Result<T, LociError>;

/// Core error types for Loci operations.
///
/// Pattern matching itself never produces one of these. They come from
/// touching a storage medium: opening a stream, asking a backend for a
/// locator or a file handle, or reading an archive or directory.
#[derive(Error, Debug)]
pub enum LociError {
    // === Resource Errors ===
    /// The resource does not exist at open time
    #[error("{description} cannot be opened because it does not exist")]
    NotFound { description: String },

    /// The backend cannot produce the requested locator or handle
    #[error("{description} cannot be resolved to {what}")]
    NotResolvable { description: String, what: String },

    /// The resource is not backed by a file in the local filesystem
    #[error("{description} is not a file in the local filesystem")]
    NotAFile { description: String },

    /// The operation is meaningless for this backend
    #[error("{operation} is not supported by {description}")]
    NotSupported {
        operation: String,
        description: String,
    },

    // === Medium Errors ===
    /// Transient failure opening an archive or directory
    #[error("medium unavailable: {medium}: {reason}")]
    MediumUnavailable { medium: String, reason: String },

    // === Location Errors ===
    /// The location string could not be interpreted
    #[error("invalid location {location}: {reason}")]
    InvalidLocation { location: String, reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LociError {
    /// Returns true if this error means the resource is simply absent
    pub fn is_not_found(&self) -> bool {
        match self {
            LociError::NotFound { .. } => true,
            LociError::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns true if a failure on one base resource may be swallowed
    /// without failing a whole pattern resolution.
    pub fn is_absorbable(&self) -> bool {
        matches!(
            self,
            LociError::NotFound { .. }
                | LociError::MediumUnavailable { .. }
                | LociError::NotResolvable { .. }
                | LociError::NotAFile { .. }
                | LociError::Io(_)
        )
    }

    /// Create a not-found error
    pub fn not_found(description: impl Into<String>) -> Self {
        LociError::NotFound {
            description: description.into(),
        }
    }

    /// Create a not-resolvable error
    pub fn not_resolvable(description: impl Into<String>, what: impl Into<String>) -> Self {
        LociError::NotResolvable {
            description: description.into(),
            what: what.into(),
        }
    }

    /// Create a not-a-file error
    pub fn not_a_file(description: impl Into<String>) -> Self {
        LociError::NotAFile {
            description: description.into(),
        }
    }

    /// Create a not-supported error
    pub fn not_supported(operation: impl Into<String>, description: impl Into<String>) -> Self {
        LociError::NotSupported {
            operation: operation.into(),
            description: description.into(),
        }
    }

    /// Create a medium-unavailable error
    pub fn medium(medium: impl Into<String>, reason: impl Into<String>) -> Self {
        LociError::MediumUnavailable {
            medium: medium.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-location error
    pub fn invalid_location(location: impl Into<String>, reason: impl Into<String>) -> Self {
        LociError::InvalidLocation {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

impl From<zip::result::ZipError> for LociError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => LociError::Io(io),
            other => LociError::MediumUnavailable {
                medium: "archive".to_string(),
                reason: other.to_string(),
            },
        }
    }
}
