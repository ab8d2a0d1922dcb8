//! Bus-driven builds and leader election

mod helpers;

use helpers::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use windpress_build::BuildWorker;
use windpress_bus::{
    Envelope, InProcessLocks, LEADER_LOCK, LeaderElection, LockManager, TARGET_ANY, peer, task,
};

const PAGE: &str = "<div class='text-red-500 p-4'></div>";
const WAIT: Duration = Duration::from_secs(5);

fn worker(h: &Harness, locks: Option<Arc<dyn LockManager>>) -> BuildWorker {
    BuildWorker::new(h.builder.clone(), h.bus.clone(), LeaderElection::new(locks))
}

#[tokio::test]
async fn test_generate_cache_replies_success() {
    let h = Harness::new(FakeBackend::single(PAGE));
    let handle = worker(&h, None).spawn();
    let mut replies = h.bus.subscribe();

    h.bus.post(
        Envelope::new(peer::DASHBOARD, peer::COMPILER, task::GENERATE_CACHE)
            .with_data(json!({"store": true, "tailwindcss_version": 4, "sourcemap": false})),
    );

    let reply = replies
        .recv_matching_timeout(peer::COMPILER, peer::DASHBOARD, task::GENERATE_CACHE_RESPONSE, WAIT)
        .await
        .unwrap();
    let data = reply.data.unwrap();
    assert_eq!(data["status"], "success");
    assert!(data["cache"]["last_full_build"].is_i64());
    assert_eq!(h.backend.stored().len(), 1);

    handle.abort();
}

#[tokio::test]
async fn test_generate_cache_replies_error() {
    let backend = FakeBackend::single(PAGE).with_failing("p");
    let h = Harness::new(backend);
    let handle = worker(&h, None).spawn();
    let mut replies = h.bus.subscribe();

    h.bus.post(Envelope::new(peer::DASHBOARD, peer::COMPILER, task::GENERATE_CACHE));

    let reply = replies
        .recv_matching_timeout(peer::COMPILER, peer::DASHBOARD, task::GENERATE_CACHE_RESPONSE, WAIT)
        .await
        .unwrap();
    let data = reply.data.unwrap();
    assert_eq!(data["status"], "error");
    assert!(data["message"].as_str().unwrap().contains("'p'"));

    handle.abort();
}

#[tokio::test]
async fn test_queued_requests_survive_long_builds() {
    let pages = (0..200).map(|_| vec![text(PAGE)]).collect();
    let backend = FakeBackend::default()
        .with_file("main.css", MAIN_CSS)
        .with_provider("p", pages);
    let h = Harness::new(backend);
    let handle = worker(&h, None).spawn();
    let mut replies = h.bus.subscribe();

    let options = json!({"store": false, "tailwindcss_version": 4, "sourcemap": false});
    for _ in 0..2 {
        h.bus.post(
            Envelope::new(peer::DASHBOARD, peer::COMPILER, task::GENERATE_CACHE).with_data(options.clone()),
        );
    }

    for _ in 0..2 {
        let reply = replies
            .recv_matching_timeout(peer::COMPILER, peer::DASHBOARD, task::GENERATE_CACHE_RESPONSE, WAIT)
            .await
            .unwrap();
        assert_eq!(reply.data.unwrap()["status"], "success");
    }
    assert_eq!(h.backend.scans_of("p"), 400);

    handle.abort();
}

#[tokio::test]
async fn test_main_css_saved_runs_incremental_build() {
    let h = Harness::new(FakeBackend::single(PAGE));
    let handle = worker(&h, None).spawn();
    let mut done = h.bus.subscribe();

    h.bus
        .post(Envelope::new(peer::DASHBOARD, TARGET_ANY, task::MAIN_CSS_SAVED));

    let reply = done
        .recv_matching_timeout(peer::COMPILER, peer::OBSERVER, task::MAIN_CSS_SAVED_DONE, WAIT)
        .await
        .unwrap();
    assert_eq!(reply.target, TARGET_ANY);
    assert_eq!(reply.data.unwrap()["status"], "success");

    let stored = h.backend.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].full_build, None);

    handle.abort();
}

#[tokio::test]
async fn test_follower_does_not_build() {
    let locks: Arc<dyn LockManager> = Arc::new(InProcessLocks::new());
    let leader = LeaderElection::new(Some(locks.clone())).elect();
    assert!(leader.is_leader());

    let h = Harness::new(FakeBackend::single(PAGE));
    let handle = worker(&h, Some(locks)).spawn();

    h.bus.post(Envelope::new(peer::DASHBOARD, peer::COMPILER, task::GENERATE_CACHE));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h.backend.scans().is_empty());
    drop(leader);
    handle.abort();
}

#[tokio::test]
async fn test_follower_takes_over_after_leader_leaves() {
    let locks = Arc::new(InProcessLocks::new());
    let shared: Arc<dyn LockManager> = locks.clone();
    let leader = LeaderElection::new(Some(shared.clone())).elect();

    let h = Harness::new(FakeBackend::single(PAGE));
    let handle = worker(&h, Some(shared)).spawn();
    drop(leader);

    for _ in 0..100 {
        if locks.is_held(LEADER_LOCK) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(locks.is_held(LEADER_LOCK), "follower never took the lock");
    // The worker resubscribes right after taking the lock.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut replies = h.bus.subscribe();
    h.bus.post(Envelope::new(peer::DASHBOARD, peer::COMPILER, task::GENERATE_CACHE));
    let reply = replies
        .recv_matching_timeout(peer::COMPILER, peer::DASHBOARD, task::GENERATE_CACHE_RESPONSE, WAIT)
        .await
        .unwrap();
    assert_eq!(reply.data.unwrap()["status"], "success");

    handle.abort();
}
