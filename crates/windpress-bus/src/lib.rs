//! Cross-context messaging for WindPress.
//!
//! The dashboard, the build worker, the live-preview observer and the
//! autocomplete index run as separate contexts. They coordinate through a
//! named [`MessageBus`] carrying [`Envelope`]s routed by exact
//! `source` + `target` + `task` match (plus the `any` broadcast target).
//!
//! Only one context should react to build triggers; see [`LeaderElection`].

mod bus;
mod envelope;
mod error;
mod leader;
mod log;

pub use bus::{DEFAULT_CHANNEL, MessageBus, Subscription};
pub use envelope::{Envelope, TARGET_ANY, peer, task};
pub use error::{BusError, Result};
pub use leader::{InProcessLocks, LEADER_LOCK, LeaderElection, Leadership, LockGuard, LockManager};
pub use log::{BusLogger, LogEvent, LogKind};
