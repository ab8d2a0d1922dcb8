//! Single-leader election over a named exclusive lock.
//!
//! The context that holds the lock runs builds; it keeps the lock until its
//! [`LockGuard`] is dropped. Followers still relay logs but never start
//! builds. Without a lock primitive every context is eligible
//! ([`Leadership::NoLeader`]), which is logged once at election time.

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Lock contended by build workers.
pub const LEADER_LOCK: &str = "windpress-compiler-leader";

/// Exclusive named locks.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Take `name` if nobody holds it.
    fn try_acquire(&self, name: &str) -> Option<LockGuard>;

    /// Wait until `name` can be taken.
    async fn acquire(&self, name: &str) -> LockGuard;
}

/// Releases its lock on drop.
pub struct LockGuard {
    name: String,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl LockGuard {
    pub fn new(name: impl Into<String>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").field("name", &self.name).finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            debug!("releasing lock {}", self.name);
            release();
        }
    }
}

#[derive(Default)]
struct LockTable {
    held: Mutex<FxHashSet<String>>,
    released: Notify,
}

/// [`LockManager`] shared by everything in this process.
#[derive(Clone, Default)]
pub struct InProcessLocks {
    table: Arc<LockTable>,
}

impl InProcessLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.table.held.lock().contains(name)
    }
}

#[async_trait]
impl LockManager for InProcessLocks {
    fn try_acquire(&self, name: &str) -> Option<LockGuard> {
        if !self.table.held.lock().insert(name.to_string()) {
            return None;
        }
        let table = self.table.clone();
        let owned = name.to_string();
        Some(LockGuard::new(name, move || {
            table.held.lock().remove(&owned);
            table.released.notify_waiters();
        }))
    }

    async fn acquire(&self, name: &str) -> LockGuard {
        loop {
            let mut notified = std::pin::pin!(self.table.released.notified());
            notified.as_mut().enable();
            if let Some(guard) = self.try_acquire(name) {
                return guard;
            }
            notified.await;
        }
    }
}

#[derive(Debug)]
pub enum Leadership {
    Leader(LockGuard),
    Follower,
    /// No lock primitive: every context may build.
    NoLeader,
}

impl Leadership {
    /// Whether this context should run builds.
    pub fn can_build(&self) -> bool {
        !matches!(self, Self::Follower)
    }

    pub fn is_leader(&self) -> bool {
        matches!(self, Self::Leader(_))
    }
}

pub struct LeaderElection {
    locks: Option<Arc<dyn LockManager>>,
    lock_name: String,
}

impl LeaderElection {
    pub fn new(locks: Option<Arc<dyn LockManager>>) -> Self {
        Self {
            locks,
            lock_name: LEADER_LOCK.to_string(),
        }
    }

    pub fn with_lock_name(mut self, name: impl Into<String>) -> Self {
        self.lock_name = name.into();
        self
    }

    /// Try to become leader without waiting.
    pub fn elect(&self) -> Leadership {
        let Some(locks) = &self.locks else {
            warn!("No lock manager available; every context may run builds");
            return Leadership::NoLeader;
        };
        match locks.try_acquire(&self.lock_name) {
            Some(guard) => {
                info!("Elected build leader ({})", self.lock_name);
                Leadership::Leader(guard)
            }
            None => {
                debug!("{} is held elsewhere, following", self.lock_name);
                Leadership::Follower
            }
        }
    }

    /// Wait until this context becomes leader.
    pub async fn wait_for_leadership(&self) -> Leadership {
        match &self.locks {
            Some(locks) => {
                let guard = locks.acquire(&self.lock_name).await;
                info!("Elected build leader ({})", self.lock_name);
                Leadership::Leader(guard)
            }
            None => self.elect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_single_leader() {
        let locks: Arc<dyn LockManager> = Arc::new(InProcessLocks::new());
        let first = LeaderElection::new(Some(locks.clone())).elect();
        let second = LeaderElection::new(Some(locks)).elect();

        assert!(first.is_leader());
        assert!(matches!(second, Leadership::Follower));
        assert!(!second.can_build());
    }

    #[test]
    fn test_release_on_drop() {
        let locks = InProcessLocks::new();
        let guard = locks.try_acquire(LEADER_LOCK).unwrap();
        assert!(locks.is_held(LEADER_LOCK));
        drop(guard);
        assert!(!locks.is_held(LEADER_LOCK));
        assert!(locks.try_acquire(LEADER_LOCK).is_some());
    }

    #[test]
    fn test_no_lock_manager_degrades_to_no_leader() {
        let leadership = LeaderElection::new(None).elect();
        assert!(matches!(leadership, Leadership::NoLeader));
        assert!(leadership.can_build());
    }

    #[tokio::test]
    async fn test_follower_takes_over_after_release() {
        let locks = Arc::new(InProcessLocks::new());
        let leader = LeaderElection::new(Some(locks.clone())).elect();
        assert!(leader.is_leader());

        let waiter = tokio::spawn({
            let locks: Arc<dyn LockManager> = locks.clone();
            async move { LeaderElection::new(Some(locks)).wait_for_leadership().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(leader);

        let promoted = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(promoted.is_leader());
    }
}
