//! Error types for TreeFind
//!
//! Only configuration and start-up problems are returned to the caller.
//! Failures met while a search is running are routed to the error hook
//! and never cross the `get`/`get_next` boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for TreeFind operations
#[derive(Error, Debug)]
pub enum FindError {
    /// I/O error while listing or resolving a path
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path being read when the error occurred
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// Base directory does not exist
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Base path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Invalid search configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The OS refused to start a worker thread
    #[error("Failed to spawn worker '{name}': {source}")]
    ThreadSpawn {
        /// Worker name
        name: String,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// A worker thread terminated by panicking (usually inside a hook)
    #[error("Worker '{0}' panicked")]
    WorkerPanicked(String),
}

impl FindError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this error is a permission issue
    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::NotFound(path) | Self::NotADirectory(path) => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for TreeFind operations
pub type Result<T> = std::result::Result<T, FindError>;

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| FindError::io(path, e))
    }
}

impl From<walkdir::Error> for FindError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
        FindError::Io {
            path,
            source: err.into(),
        }
    }
}
