//! Named broadcast channel.
//!
//! Every subscriber sees every envelope posted after it subscribed,
//! including its own posts. Slow subscribers that fall more than the channel
//! capacity behind lose the oldest envelopes; the loss is logged and
//! receiving continues.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{trace, warn};

use crate::envelope::Envelope;
use crate::error::{BusError, Result};

/// Channel name used by every WindPress context.
pub const DEFAULT_CHANNEL: &str = "windpress";

const CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct MessageBus {
    name: Arc<str>,
    tx: broadcast::Sender<Envelope>,
}

impl MessageBus {
    pub fn new(name: impl AsRef<str>) -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self {
            name: Arc::from(name.as_ref()),
            tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Post an envelope. Returns how many subscribers received it; posting
    /// with nobody listening is not an error.
    pub fn post(&self, envelope: Envelope) -> usize {
        trace!(
            "[{}] {} -> {}: {}",
            self.name, envelope.source, envelope.target, envelope.task
        );
        self.tx.send(envelope).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            name: self.name.clone(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL)
    }
}

pub struct Subscription {
    name: Arc<str>,
    rx: broadcast::Receiver<Envelope>,
}

impl Subscription {
    /// Next envelope on the channel.
    pub async fn recv(&mut self) -> Result<Envelope> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => return Ok(envelope),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("[{}] subscriber lagged, {skipped} message(s) dropped", self.name);
                }
                Err(RecvError::Closed) => return Err(BusError::Closed(self.name.to_string())),
            }
        }
    }

    /// Next envelope matching `source`, `target` and `task`. Others are skipped.
    pub async fn recv_matching(&mut self, source: &str, target: &str, task: &str) -> Result<Envelope> {
        loop {
            let envelope = self.recv().await?;
            if envelope.matches(source, target, task) {
                return Ok(envelope);
            }
        }
    }

    /// [`Subscription::recv_matching`] with a deadline.
    pub async fn recv_matching_timeout(
        &mut self,
        source: &str,
        target: &str,
        task: &str,
        timeout: Duration,
    ) -> Result<Envelope> {
        tokio::time::timeout(timeout, self.recv_matching(source, target, task))
            .await
            .map_err(|_| BusError::Timeout {
                task: task.to_string(),
                timeout_ms: timeout.as_millis(),
            })?
    }

    /// Envelope already queued, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("[{}] subscriber lagged, {skipped} message(s) dropped", self.name);
                }
                Err(_) => return None,
            }
        }
    }
}
