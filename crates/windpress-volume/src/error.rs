use std::path::PathBuf;

use thiserror::Error;

/// Result type for volume operations.
pub type VolumeResult<T> = Result<T, VolumeError>;

/// Errors produced while decoding, encoding or materializing a volume.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// The container is not valid base64.
    #[error("volume container is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not valid UTF-8.
    #[error("volume container is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The decoded text is not valid JSON.
    #[error("volume container is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The decoded JSON is valid but not a `{path: content}` object.
    #[error("volume container must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// A path would escape the volume root when written to disk.
    #[error("invalid volume path: {0}")]
    InvalidPath(String),

    /// Decompressed backup exceeded the size limit.
    #[error("backup too large: more than {max_bytes} bytes after decompression")]
    TooLarge { max_bytes: u64 },

    /// Compression stream failure.
    #[error("compression error: {0}")]
    Compression(#[source] std::io::Error),

    /// Filesystem failure while importing or exporting a volume.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VolumeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
