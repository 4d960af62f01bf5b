//! Error handling for the pilet dev server.
//!
//! The hierarchy mirrors how failures are contained at runtime:
//! - **`PiletError`** is returned by config loading, the watcher, and request
//!   resolution. A resolution error fails only the request that produced it.
//! - **`ConfigError`** carries actionable hints for bad configuration.
//! - **`PushError`** describes a failed delivery to one live connection. It
//!   never escapes the connection registry.
//!
//! # Example
//!
//! ```rust,no_run
//! use fob_pilet::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_descriptor(root: &Path) -> Result<String> {
//!     let path = root.join("package.json");
//!     std::fs::read_to_string(&path)
//!         .with_path(&path)
//!         .with_hint("Run the server from the pilet root")
//! }
//! ```

pub mod miette;

pub use self::miette::pilet_error_to_miette;

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum PiletError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The package descriptor could not be parsed
    #[error("Invalid package descriptor {}: {source}\n\nHint: Check package.json syntax", .path.display())]
    Package {
        /// Location of the descriptor
        path: PathBuf,
        /// Underlying parse failure
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configured directory doesn't exist
    #[error("Directory not found: {}\n\nHint: Check the '--root' and '--app' arguments", .0.display())]
    NotFound(PathBuf),

    /// An explicitly given config file doesn't exist
    #[error("Config file not found: {}\n\nHint: Check the '--config' argument, or drop it to use pilet.config.json in the pilet root", .0.display())]
    FileNotFound(PathBuf),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },
}

/// Failure to deliver a document to a single live connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    /// The subscriber's channel is gone
    #[error("connection closed")]
    Closed,

    /// The subscriber is not draining its channel
    #[error("connection backlog is full")]
    Backlogged,
}

/// Result type alias using `PiletError` as the default error type.
pub type Result<T, E = PiletError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Add a file path to the error context.
    ///
    /// A `NotFound` I/O error becomes [`PiletError::FileNotFound`].
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Add a helpful hint to the error context.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error with a message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<PiletError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            PiletError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                PiletError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: PiletError = e.into();
            PiletError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: PiletError = e.into();
            PiletError::Custom(format!("{}: {}", msg, err))
        })
    }
}
