use serde::{Deserialize, Serialize};

use crate::path;

/// How the backend treats an entry. Opaque to the build pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryHandler {
    #[default]
    Internal,
    ReadOnly,
    Custom(String),
}

impl From<String> for EntryHandler {
    fn from(value: String) -> Self {
        match value.as_str() {
            "internal" => Self::Internal,
            "read-only" => Self::ReadOnly,
            _ => Self::Custom(value),
        }
    }
}

impl From<EntryHandler> for String {
    fn from(value: EntryHandler) -> Self {
        match value {
            EntryHandler::Internal => "internal".to_string(),
            EntryHandler::ReadOnly => "read-only".to_string(),
            EntryHandler::Custom(name) => name,
        }
    }
}

/// A file as the backend's volume endpoint describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub relative_path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub handler: EntryHandler,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
}

impl Entry {
    pub fn new(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        Self {
            name: path::file_name(&relative_path).to_string(),
            relative_path,
            content: content.into(),
            handler: EntryHandler::Internal,
            signature: None,
            hidden: None,
            readonly: None,
        }
    }
}
