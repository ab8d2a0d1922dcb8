//! Bus-driven build worker.
//!
//! One context per lock holds the compiler leadership and answers build
//! requests on the bus. The others wait for the lock and take over when the
//! leader goes away. Requests are queued and built one at a time, in the
//! order they arrived.

use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use windpress_bus::{BusError, Envelope, LeaderElection, Leadership, MessageBus, Subscription, TARGET_ANY, peer, task};

use crate::builder::CacheBuilder;
use crate::models::BuildCacheOptions;

pub struct BuildWorker {
    builder: Arc<CacheBuilder>,
    bus: MessageBus,
    election: LeaderElection,
}

impl BuildWorker {
    pub fn new(builder: Arc<CacheBuilder>, bus: MessageBus, election: LeaderElection) -> Self {
        Self { builder, bus, election }
    }

    /// Run for compiler peers. Subscribes before returning, so requests
    /// posted right after `spawn` are not missed.
    pub fn spawn(self) -> JoinHandle<()> {
        let leadership = self.election.elect();
        let subscription = self.bus.subscribe();
        tokio::spawn(self.run(leadership, subscription))
    }

    async fn run(self, leadership: Leadership, subscription: Subscription) {
        let (_leadership, mut subscription) = if leadership.can_build() {
            (leadership, subscription)
        } else {
            info!("another context is building, waiting for the compiler lock");
            drop(subscription);
            let leadership = self.election.wait_for_leadership().await;
            (leadership, self.bus.subscribe())
        };

        // The bus keeps draining while a build runs; requests wait in `queue`.
        let worker = Arc::new(self);
        let (queue, mut pending) = mpsc::unbounded_channel();
        let builds = tokio::spawn(async move {
            while let Some(request) = pending.recv().await {
                worker.process(request).await;
            }
        });

        loop {
            match subscription.recv().await {
                Ok(envelope) => {
                    let Some(request) = BuildRequest::from_envelope(envelope) else {
                        continue;
                    };
                    if queue.send(request).is_err() {
                        break;
                    }
                }
                Err(BusError::Closed(name)) => {
                    debug!("bus {name} closed, stopping build worker");
                    break;
                }
                Err(err) => warn!("build worker: {err}"),
            }
        }

        drop(queue);
        if let Err(err) = builds.await {
            warn!("build queue stopped: {err}");
        }
    }

    async fn process(&self, request: BuildRequest) {
        match request {
            BuildRequest::Generate(envelope) => self.generate_cache(&envelope).await,
            BuildRequest::Saved { options, done } => {
                let status = match self.builder.build_cache(options).await {
                    Ok(_) => json!({ "status": "success" }),
                    Err(err) => json!({ "status": "error", "message": err.to_string() }),
                };
                self.bus
                    .post(Envelope::new(peer::COMPILER, TARGET_ANY, done).with_data(status));
            }
        }
    }

    async fn generate_cache(&self, request: &Envelope) {
        let reply = request.reply(task::GENERATE_CACHE_RESPONSE);
        let options = match request.data_as::<BuildCacheOptions>() {
            Ok(options) => options.unwrap_or_default(),
            Err(err) => {
                self.bus.post(reply.with_data(json!({
                    "status": "error",
                    "message": err.to_string(),
                })));
                return;
            }
        };

        let data = match self.builder.build_cache(options).await {
            Ok(outcome) => json!({ "status": "success", "cache": outcome.cache }),
            Err(err) => json!({ "status": "error", "message": err.to_string() }),
        };
        self.bus.post(reply.with_data(data));
    }
}

/// A bus message the worker answers with a build, in arrival order.
#[derive(Debug)]
enum BuildRequest {
    Generate(Envelope),
    Saved {
        options: BuildCacheOptions,
        done: &'static str,
    },
}

impl BuildRequest {
    fn from_envelope(envelope: Envelope) -> Option<Self> {
        if envelope.matches(peer::DASHBOARD, peer::COMPILER, task::GENERATE_CACHE) {
            return Some(Self::Generate(envelope));
        }

        let done = match envelope.task.as_str() {
            task::MAIN_CSS_SAVED => task::MAIN_CSS_SAVED_DONE,
            task::CODE_EDITOR_SAVED => task::CODE_EDITOR_SAVED_DONE,
            _ => return None,
        };
        if envelope.target != peer::COMPILER && envelope.target != TARGET_ANY {
            return None;
        }

        let options = match envelope.data_as::<BuildCacheOptions>() {
            Ok(Some(options)) => options,
            Ok(None) => BuildCacheOptions::incremental(),
            Err(err) => {
                warn!("{err}, falling back to an incremental build");
                BuildCacheOptions::incremental()
            }
        };
        Some(Self::Saved { options, done })
    }
}
