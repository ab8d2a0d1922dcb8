//! Error types for the build pipeline

use miette::Diagnostic;
use thiserror::Error;
use windpress_compiler::{CandidateError, CompileError, FetchError, OptimizeError};
use windpress_volume::VolumeError;

/// Failures talking to the WordPress backend.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum BackendError {
    #[error("Invalid backend URL '{url}': {reason}")]
    #[diagnostic(
        code(windpress::backend::invalid_url),
        help("Set siteUrl to the site root, e.g. https://example.com")
    )]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {message}")]
    #[diagnostic(code(windpress::backend::transport))]
    Transport { url: String, message: String },

    #[error("Backend responded with HTTP {status}: {message}")]
    #[diagnostic(
        code(windpress::backend::status),
        help("Check the site URL, the application password and that WindPress is active")
    )]
    Status { status: u16, message: String },

    #[error("Unexpected response from {url}: {message}")]
    #[diagnostic(code(windpress::backend::decode))]
    Decode { url: String, message: String },
}

/// Durable provider cache failures. Never fatal to a build.
#[derive(Error, Debug)]
pub enum ProviderCacheError {
    #[error("no durable store configured")]
    Unavailable,

    #[error("durable store error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt provider cache: {0}")]
    Corrupt(#[from] VolumeError),
}

impl From<redb::Error> for ProviderCacheError {
    fn from(err: redb::Error) -> Self {
        ProviderCacheError::Database(err.to_string())
    }
}

impl From<redb::DatabaseError> for ProviderCacheError {
    fn from(err: redb::DatabaseError) -> Self {
        ProviderCacheError::Database(err.to_string())
    }
}

impl From<redb::TableError> for ProviderCacheError {
    fn from(err: redb::TableError) -> Self {
        ProviderCacheError::Database(err.to_string())
    }
}

impl From<redb::TransactionError> for ProviderCacheError {
    fn from(err: redb::TransactionError) -> Self {
        ProviderCacheError::Database(err.to_string())
    }
}

impl From<redb::StorageError> for ProviderCacheError {
    fn from(err: redb::StorageError) -> Self {
        ProviderCacheError::Database(err.to_string())
    }
}

impl From<redb::CommitError> for ProviderCacheError {
    fn from(err: redb::CommitError) -> Self {
        ProviderCacheError::Database(err.to_string())
    }
}

/// Failures loading one `@source` declaration.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Unsupported source '{0}'")]
    UnsupportedScheme(String),

    #[error("Invalid glob '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("Package listing for {package} is malformed: {reason}")]
    Listing { package: String, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Source content is not valid base64/UTF-8: {0}")]
    Decode(String),
}

/// Failures that abort a build.
#[derive(Error, Debug, Diagnostic)]
pub enum BuildError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Backend(#[from] BackendError),

    #[error("Failed to scan provider '{provider}': {source}")]
    #[diagnostic(code(windpress::build::scan))]
    Scan {
        provider: String,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Optimize(#[from] OptimizeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Candidates(#[from] CandidateError),

    #[error("Failed to decode scanned content: {0}")]
    #[diagnostic(code(windpress::build::content))]
    Content(String),

    #[error("Build task failed: {0}")]
    #[diagnostic(code(windpress::build::task))]
    Task(String),
}
