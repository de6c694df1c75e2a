//! Error types for clipdeck.
//!
//! Validation failures are returned to the caller and leave the project
//! untouched. Persistence failures are mostly absorbed by the coordinator and
//! surfaced through the save status instead of as errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for clipdeck operations.
pub type Result<T> = std::result::Result<T, ClipdeckError>;

/// Errors that can occur while editing or persisting a project.
#[derive(Error, Debug)]
pub enum ClipdeckError {
    // Validation Errors
    #[error("Invalid time range: start {start}, end {end:?}: {reason}")]
    InvalidTimeRange {
        start: f64,
        end: Option<f64>,
        reason: &'static str,
    },

    #[error("Invalid duration: {duration}")]
    InvalidDuration { duration: f64 },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Patch field '{field}' does not apply to {kind} '{id}'")]
    PatchNotApplicable {
        id: String,
        kind: &'static str,
        field: &'static str,
    },

    #[error("Track index {index} out of bounds ({len} tracks)")]
    TrackIndexOutOfBounds { index: usize, len: usize },

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Local Store Errors
    #[error("Local store rejected write for '{key}': {reason}")]
    LocalWriteRejected { key: String, reason: String },

    // Remote Store Errors
    #[error("Remote write failed for {collection}/{id}: {reason}")]
    RemoteWriteFailed {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Remote write timed out after {after_ms} ms")]
    RemoteTimeout { after_ms: u64 },

    #[error("Remote read failed: {reason}")]
    RemoteReadFailed { reason: String },

    #[error("Remote query failed: {reason}")]
    RemoteQueryFailed { reason: String },

    #[error("No async runtime available for remote sync")]
    NoRuntime,

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Unsupported project schema version: {version}")]
    UnsupportedSchemaVersion { version: String },

    #[error("Migration failed from {from} to {to}: {reason}")]
    MigrationError {
        from: String,
        to: String,
        reason: String,
    },

    // Serialization Errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClipdeckError {
    /// Get the error code for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClipdeckError::InvalidTimeRange { .. } => "INVALID_TIME_RANGE",
            ClipdeckError::InvalidDuration { .. } => "INVALID_DURATION",
            ClipdeckError::InvalidParameter { .. } => "INVALID_PARAMETER",
            ClipdeckError::PatchNotApplicable { .. } => "PATCH_NOT_APPLICABLE",
            ClipdeckError::TrackIndexOutOfBounds { .. } => "TRACK_INDEX_OUT_OF_BOUNDS",
            ClipdeckError::FileReadError { .. } => "FILE_READ_ERROR",
            ClipdeckError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            ClipdeckError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            ClipdeckError::LocalWriteRejected { .. } => "LOCAL_WRITE_REJECTED",
            ClipdeckError::RemoteWriteFailed { .. } => "REMOTE_WRITE_FAILED",
            ClipdeckError::RemoteTimeout { .. } => "REMOTE_TIMEOUT",
            ClipdeckError::RemoteReadFailed { .. } => "REMOTE_READ_FAILED",
            ClipdeckError::RemoteQueryFailed { .. } => "REMOTE_QUERY_FAILED",
            ClipdeckError::NoRuntime => "NO_RUNTIME",
            ClipdeckError::InvalidConfig { .. } => "INVALID_CONFIG",
            ClipdeckError::UnsupportedSchemaVersion { .. } => "UNSUPPORTED_SCHEMA_VERSION",
            ClipdeckError::MigrationError { .. } => "MIGRATION_ERROR",
            ClipdeckError::Json(_) => "JSON_ERROR",
            ClipdeckError::Io(_) => "IO_ERROR",
        }
    }

    /// Returns true if the failed operation may succeed when attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClipdeckError::RemoteWriteFailed { .. }
                | ClipdeckError::RemoteTimeout { .. }
                | ClipdeckError::RemoteReadFailed { .. }
                | ClipdeckError::RemoteQueryFailed { .. }
                | ClipdeckError::FileWriteError { .. }
                | ClipdeckError::LocalWriteRejected { .. }
        )
    }

    /// Returns true if the error comes from caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClipdeckError::InvalidTimeRange { .. }
                | ClipdeckError::InvalidDuration { .. }
                | ClipdeckError::InvalidParameter { .. }
                | ClipdeckError::PatchNotApplicable { .. }
                | ClipdeckError::TrackIndexOutOfBounds { .. }
        )
    }

    /// Returns a user-friendly recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            ClipdeckError::InvalidTimeRange { .. } => {
                Some("Make sure the end time is after the start time and both are positive.")
            }
            ClipdeckError::RemoteWriteFailed { .. } | ClipdeckError::RemoteTimeout { .. } => {
                Some("Your edits are saved locally. The next edit will retry the cloud sync.")
            }
            ClipdeckError::LocalWriteRejected { .. } | ClipdeckError::FileWriteError { .. } => {
                Some("Free up storage space; edits are kept in memory meanwhile.")
            }
            ClipdeckError::NoRuntime => Some("Run the editor inside a tokio runtime to enable cloud sync."),
            ClipdeckError::UnsupportedSchemaVersion { .. } => {
                Some("The project was written by a newer version. Upgrade clipdeck to open it.")
            }
            _ => None,
        }
    }
}
