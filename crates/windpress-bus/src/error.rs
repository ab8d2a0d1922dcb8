use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    /// Every sender of the channel was dropped.
    #[error("Message bus '{0}' is closed")]
    Closed(String),

    #[error("Timed out after {timeout_ms}ms waiting for '{task}'")]
    Timeout { task: String, timeout_ms: u128 },

    #[error("Invalid payload for '{task}': {source}")]
    Payload {
        task: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, BusError>;
