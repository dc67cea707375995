//! Error types for scalebench
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Only configuration and persistence problems surface here. Per-trial
//! problems are [`crate::runner::TrialFailure`] values and never abort a run.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// scalebench error types
#[derive(Error, Debug)]
pub enum Error {
    /// Counter executable absent at orchestration start
    #[error("Executable not found: {}\nBuild the counter binaries before benchmarking", .path.display())]
    MissingExecutable {
        /// Path that was probed
        path: PathBuf,
    },

    /// Configuration rejected during INIT
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No persisted experiment record exists
    #[error("No experiment records found in {}", .dir.display())]
    RecordNotFound {
        /// Directory that was scanned
        dir: PathBuf,
    },

    /// A record with the same token was already written (records are write-once)
    #[error("Experiment record already exists: {}", .path.display())]
    RecordExists {
        /// Path of the existing record
        path: PathBuf,
    },

    /// Results directory cannot be created or written during INIT
    #[error("Results directory is not writable: {}: {source}\nPoint output.directory at a writable location", .dir.display())]
    ResultsDirUnwritable {
        /// Directory that was checked
        dir: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Record token could not be parsed
    #[error("Invalid record token: {0}")]
    InvalidToken(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
