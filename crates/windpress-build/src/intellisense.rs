//! Class-name completion index.
//!
//! [`ClassIndex`] keeps a sorted snapshot of known class names and answers
//! prefix queries against it. It is refreshed whenever the compiler peer
//! announces a finished build on the bus.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use windpress_bus::{BusError, Envelope, MessageBus, task};

/// Where an index gets its class names from.
#[async_trait]
pub trait ClassSource: Send + Sync {
    async fn classes(&self) -> Vec<String>;
}

#[async_trait]
impl ClassSource for Vec<String> {
    async fn classes(&self) -> Vec<String> {
        self.clone()
    }
}

pub struct ClassIndex {
    source: Arc<dyn ClassSource>,
    classes: RwLock<Vec<String>>,
}

impl ClassIndex {
    pub fn new(source: Arc<dyn ClassSource>) -> Self {
        Self {
            source,
            classes: RwLock::new(Vec::new()),
        }
    }

    /// Reload from the source. Returns the number of indexed classes.
    pub async fn refresh(&self) -> usize {
        let mut classes = self.source.classes().await;
        classes.sort_unstable();
        classes.dedup();
        let count = classes.len();
        *self.classes.write() = classes;
        debug!("class index refreshed with {count} classes");
        count
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }

    /// Up to `limit` classes starting with `prefix`, in sorted order.
    pub fn query(&self, prefix: &str, limit: usize) -> Vec<String> {
        let classes = self.classes.read();
        let start = classes.partition_point(|class| class.as_str() < prefix);
        classes[start..]
            .iter()
            .take_while(|class| class.starts_with(prefix))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Refresh on every finished build announced on `bus` until the bus closes.
    pub fn listen(self: Arc<Self>, bus: &MessageBus) -> JoinHandle<()> {
        let mut subscription = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match subscription.recv().await {
                    Ok(envelope) if is_build_finished(&envelope) => {
                        self.refresh().await;
                    }
                    Ok(envelope) => trace!("class index ignoring {}", envelope.task),
                    Err(BusError::Closed(_)) => break,
                    Err(err) => debug!("class index listener: {err}"),
                }
            }
        })
    }
}

fn is_build_finished(envelope: &Envelope) -> bool {
    match envelope.task.as_str() {
        task::MAIN_CSS_SAVED_DONE | task::CODE_EDITOR_SAVED_DONE => true,
        task::GENERATE_CACHE_RESPONSE => envelope
            .data
            .as_ref()
            .and_then(|data| data.get("status"))
            .and_then(|status| status.as_str())
            == Some("success"),
        _ => false,
    }
}
