//! Message envelope and the well-known peer and task names.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BusError, Result};

/// Logical peers on the bus.
pub mod peer {
    pub const DASHBOARD: &str = "windpress/dashboard";
    pub const COMPILER: &str = "windpress/compiler";
    pub const OBSERVER: &str = "windpress/observer";
    pub const INTELLISENSE: &str = "windpress/intellisense";
}

/// Task names.
pub mod task {
    pub const GENERATE_CACHE: &str = "generate-cache";
    pub const GENERATE_CACHE_RESPONSE: &str = "generate-cache.response";
    pub const LOG_ADD: &str = "log.add";
    pub const LOG_UPDATE: &str = "log.update";
    pub const CODE_EDITOR_SAVED: &str = "windpress.code-editor.saved";
    pub const CODE_EDITOR_SAVED_DONE: &str = "windpress.code-editor.saved.done";
    pub const MAIN_CSS_SAVED: &str = "windpress.main_css.saved";
    pub const MAIN_CSS_SAVED_DONE: &str = "windpress.main_css.saved.done";
}

/// Broadcast address: an envelope targeted at `any` is accepted by every
/// listener regardless of the target it waits for.
pub const TARGET_ANY: &str = "any";

/// `{source, target, task, data?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub source: String,
    pub target: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn new(source: impl Into<String>, target: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            task: task.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Exact `source` and `task` match; `target` matches exactly or the
    /// envelope was sent to [`TARGET_ANY`].
    pub fn matches(&self, source: &str, target: &str, task: &str) -> bool {
        self.source == source
            && self.task == task
            && (self.target == target || self.target == TARGET_ANY)
    }

    /// Deserialize `data`. A missing payload is `Ok(None)`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.data {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| BusError::Payload {
                    task: self.task.clone(),
                    source,
                }),
        }
    }

    /// Reply envelope: source and target swapped.
    pub fn reply(&self, task: impl Into<String>) -> Self {
        Self::new(self.target.clone(), self.source.clone(), task)
    }
}
