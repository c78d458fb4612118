//! Error types for the Kiln pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the build pipeline
///
/// Every variant is fatal: the pipeline fails fast and reports to the operator.
#[derive(Debug, Error)]
pub enum Error {
    /// A platform descriptor file is not structurally valid
    #[error("Failed to decode platform profile {}: {message}", .path.display())]
    ProfileDecode { path: PathBuf, message: String },

    /// No profile with the requested name is loaded
    #[error("Unknown platform '{name}' (available: {})", .available.join(", "))]
    UnknownProfile { name: String, available: Vec<String> },

    /// A project file is not structurally valid
    #[error("Failed to decode project file {}: {message}", .path.display())]
    ProjectDecode { path: PathBuf, message: String },

    /// A required output path is occupied by something that is not a directory
    #[error("'{}' exists and it is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The version string cannot be used with the selected naming strategy
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// The derived package name cannot be used as a directory name
    #[error("Invalid package name '{0}': must be a single path-safe component")]
    InvalidPackageName(String),

    /// Control metadata could not be parsed back into a descriptor
    #[error("Failed to parse control metadata: {0}")]
    ControlParse(String),

    /// A path argument does not satisfy its contract (e.g. must be absolute)
    #[error("Invalid path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Filesystem operation failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A build session was driven through an illegal lifecycle transition
    #[error("Invalid build session transition: {0}")]
    InvalidSession(String),

    /// The container engine failed or could not be reached
    #[error("Container runtime error: {0}")]
    Runtime(String),

    /// The caller's output sink rejected a log chunk
    #[error("Failed to forward build output: {0}")]
    Sink(#[source] std::io::Error),
}

impl Error {
    /// Create an I/O error bound to the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a runtime error from any message
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    /// Check if this error came from the container engine
    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }
}
