//! Error handling for the WindPress CLI.
//!
//! `CliError` is the top-level error returned by every command. Library
//! errors convert into it through `#[from]`, and `error::miette` turns it
//! into a report at the edge of `main`.

use std::path::PathBuf;
use thiserror::Error;
use windpress_build::{BackendError, BuildError};
use windpress_compiler::{CandidateError, CompileError, FetchError, OptimizeError};
use windpress_volume::VolumeError;

pub mod miette;

pub use self::miette::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration errors (missing file, bad value, missing field)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cache build failures
    #[error("Build failed: {0}")]
    Build(#[from] BuildError),

    /// Tailwind compilation failures
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// CSS optimization failures
    #[error("Optimize error: {0}")]
    Optimize(#[from] OptimizeError),

    /// Candidate extraction failures
    #[error("Candidate extraction failed: {0}")]
    Candidates(#[from] CandidateError),

    /// WordPress REST API failures outside of a build
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// CDN fetch failures
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Volume encoding or filesystem failures
    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a windpress.config.json file or pass --config <path>", .0.display())]
    NotFound(PathBuf),

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

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for attaching file paths to I/O failures.
pub trait ResultExt<T> {
    /// Turn a `NotFound` I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }
}
