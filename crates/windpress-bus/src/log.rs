//! Structured build log events carried over the bus.
//!
//! Events with an `id` can be posted once with [`BusLogger::add`] and then
//! replaced in place with [`BusLogger::update`] (for example a scanning
//! line that later gets " - done" appended). Every event is mirrored into
//! `tracing` at the matching level.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::bus::MessageBus;
use crate::envelope::{Envelope, task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl LogEvent {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            id: None,
            group: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogKind::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogKind::Error, message)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Posts [`LogEvent`]s from one peer to another.
#[derive(Debug, Clone)]
pub struct BusLogger {
    bus: MessageBus,
    source: String,
    target: String,
}

impl BusLogger {
    pub fn new(bus: MessageBus, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            bus,
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn add(&self, event: LogEvent) {
        self.post(task::LOG_ADD, event);
    }

    /// Replace the previously added event with the same `id`.
    pub fn update(&self, event: LogEvent) {
        self.post(task::LOG_UPDATE, event);
    }

    fn post(&self, task: &str, event: LogEvent) {
        mirror(&event);
        match serde_json::to_value(&event) {
            Ok(data) => {
                self.bus
                    .post(Envelope::new(&self.source, &self.target, task).with_data(data));
            }
            Err(e) => warn!("dropping unserializable log event: {e}"),
        }
    }
}

fn mirror(event: &LogEvent) {
    let id = event.id.as_deref().unwrap_or("-");
    match event.kind {
        LogKind::Info | LogKind::Success => info!(target: "windpress::build", id, "{}", event.message),
        LogKind::Warning => warn!(target: "windpress::build", id, "{}", event.message),
        LogKind::Error => error!(target: "windpress::build", id, "{}", event.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::peer;
    use serde_json::json;

    #[test]
    fn test_log_event_wire_format() {
        let event = LogEvent::info("Scanning provider gutenberg (batch 1)").with_id("scan-gutenberg-1");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "message": "Scanning provider gutenberg (batch 1)",
                "type": "info",
                "id": "scan-gutenberg-1"
            })
        );
    }

    #[tokio::test]
    async fn test_add_then_update() {
        let bus = MessageBus::new("test");
        let mut sub = bus.subscribe();
        let logger = BusLogger::new(bus, peer::COMPILER, peer::DASHBOARD);

        logger.add(LogEvent::info("Scanning").with_id("scan-a-1"));
        logger.update(LogEvent::info("Scanning - done").with_id("scan-a-1"));

        let added = sub.recv().await.unwrap();
        assert_eq!(added.task, task::LOG_ADD);
        let updated = sub.recv().await.unwrap();
        assert_eq!(updated.task, task::LOG_UPDATE);

        let event: LogEvent = updated.data_as().unwrap().unwrap();
        assert_eq!(event.message, "Scanning - done");
        assert_eq!(event.id.as_deref(), Some("scan-a-1"));
    }
}
