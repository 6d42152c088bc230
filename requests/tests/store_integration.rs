//! Integration tests for request tracking with the Store runtime

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use lifecycle_requests::{
    ActionKind, RequestEnvironment, RequestReducer, RequestState, RequestStatus, RequestStore,
    TrackError, cancel_request, create_and_start_request, remove_request, start_request,
    succeed_request, track, track_as, track_with_timeout,
};
use lifecycle_runtime::Store;
use lifecycle_testing::ManualClock;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

fn store_with_clock(clock: Arc<ManualClock>) -> RequestStore {
    Store::new(
        RequestState::new(),
        RequestReducer::new(),
        RequestEnvironment::new(clock),
    )
}

fn store() -> RequestStore {
    store_with_clock(Arc::new(ManualClock::default()))
}

#[tokio::test]
async fn test_full_lifecycle_through_store() {
    let clock = Arc::new(ManualClock::starting_at(10_000));
    let store = store_with_clock(clock.clone());

    let (created, started) = create_and_start_request("FETCH_USER");
    let id = created.id.clone();

    store.send(created).await.unwrap();
    assert_eq!(store.state(|s| s.status_of(&id)).await, Some(RequestStatus::NotStarted));

    clock.advance_millis(5);
    store.send(started).await.unwrap();
    clock.advance_millis(20);
    store
        .send(succeed_request(id.clone()).with_name("FETCH_USER").with_payload(json!({"user": 1})))
        .await
        .unwrap();

    let meta = store.state(|s| s.get(&id).cloned()).await.unwrap();
    assert_eq!(meta.status, RequestStatus::Success);
    assert_eq!(meta.entered_at(RequestStatus::Loading), Some(10_005));
    assert_eq!(meta.entered_at(RequestStatus::Success), Some(10_025));
    assert_eq!(meta.result(), Some(&json!({"user": 1})));

    store.send(remove_request(id.clone())).await.unwrap();
    assert!(store.state(RequestState::is_empty).await);
}

#[tokio::test]
async fn test_action_log_uses_wire_types() {
    let store = store();
    let mut log = store.subscribe_actions();

    store.send(start_request("SEARCH").with_id("s1")).await.unwrap();
    store.send(cancel_request("s1").with_name("SEARCH")).await.unwrap();

    let types = [log.recv().await.unwrap(), log.recv().await.unwrap()]
        .map(|action| action.action_type());
    assert_eq!(types, ["@@request/START/SEARCH", "@@request/CANCEL/SEARCH"]);
}

#[tokio::test]
async fn test_concurrent_requests_with_same_name() {
    let store = store();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                track(&store, "AUTOCOMPLETE", async move { Ok::<_, String>(i) }).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let (total, succeeded) = store
        .state(|s| {
            (
                s.by_name("AUTOCOMPLETE").count(),
                s.by_name("AUTOCOMPLETE")
                    .filter(|m| m.status == RequestStatus::Success)
                    .count(),
            )
        })
        .await;
    assert_eq!(total, 10);
    assert_eq!(succeeded, 10);
}

#[tokio::test]
async fn test_track_reports_failure() {
    let store = store();
    let mut log = store.subscribe_actions();

    let result = track(&store, "DELETE_USER", async { Err::<(), _>("permission denied") }).await;

    let Err(TrackError::Failed { id, message }) = result else {
        panic!("expected failure, got {result:?}");
    };
    assert_eq!(message, "permission denied");

    let meta = store.state(|s| s.get(&id).cloned()).await.unwrap();
    assert_eq!(meta.status, RequestStatus::Failure);
    assert_eq!(meta.error, Some(json!({"message": "permission denied"})));

    assert_eq!(log.recv().await.unwrap().kind, ActionKind::Start);
    assert_eq!(log.recv().await.unwrap().kind, ActionKind::Fail);
}

#[tokio::test]
async fn test_cancel_while_running_drops_outcome() {
    let store = store();
    let (release, gate) = oneshot::channel::<()>();

    let tracked = {
        let store = store.clone();
        tokio::spawn(async move {
            track_as(&store, start_request("UPLOAD").with_id("u1"), async move {
                gate.await.map_err(|e| e.to_string())?;
                Ok::<_, String>("done")
            })
            .await
        })
    };

    // Wait for the START to land before cancelling.
    for _ in 0..100 {
        if store.state(|s| s.contains(&"u1".into())).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let mut log = store.subscribe_actions();
    store.send(cancel_request("u1")).await.unwrap();
    release.send(()).unwrap();

    let result = tracked.await.unwrap();
    assert!(matches!(result, Err(TrackError::Cancelled { .. })));
    assert_eq!(
        store.state(|s| s.status_of(&"u1".into())).await,
        Some(RequestStatus::Cancelled)
    );

    // The late outcome is still reported, and the reducer ignores it.
    assert_eq!(log.recv().await.unwrap().kind, ActionKind::Cancel);
    assert_eq!(log.recv().await.unwrap().kind, ActionKind::Succeed);
    let meta = store.state(|s| s.get(&"u1".into()).cloned()).await.unwrap();
    assert_eq!(meta.entered_at(RequestStatus::Success), None);
    assert_eq!(meta.result(), None);
}

#[tokio::test]
async fn test_unencodable_result_is_reported_as_failure() {
    let store = store();
    let mut log = store.subscribe_actions();

    // JSON objects need string keys, so tuple keys cannot be encoded.
    let result = track(&store, "FETCH", async {
        Ok::<_, String>(HashMap::from([((1, 2), 3)]))
    })
    .await;

    let Err(TrackError::Encode { id, .. }) = result else {
        panic!("expected encode error, got {result:?}");
    };

    assert_eq!(log.recv().await.unwrap().kind, ActionKind::Start);
    let fail = log.recv().await.unwrap();
    assert_eq!(fail.kind, ActionKind::Fail);
    assert_eq!(fail.action_type(), "@@request/FAIL/FETCH");

    let meta = store.state(|s| s.get(&id).cloned()).await.unwrap();
    assert_eq!(meta.status, RequestStatus::Failure);
    assert!(meta.error.as_ref().and_then(|e| e.get("message")).is_some());
    assert_eq!(store.state(|s| s.in_flight().count()).await, 0);
    assert!(!store.state(|s| s.is_loading("FETCH")).await);
}

#[tokio::test]
async fn test_timeout_is_expressed_as_cancel() {
    let store = store();

    let result = track_with_timeout(&store, "SLOW", Duration::from_millis(10), async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, String>(())
    })
    .await;

    let Err(TrackError::TimedOut { id, timeout }) = result else {
        panic!("expected timeout, got {result:?}");
    };
    assert_eq!(timeout, Duration::from_millis(10));

    let meta = store.state(|s| s.get(&id).cloned()).await.unwrap();
    assert_eq!(meta.status, RequestStatus::Cancelled);
    assert_eq!(meta.payload, Some(json!({"reason": "timeout", "timeout_ms": 10})));
    assert_eq!(store.pending_effects(), 0);
}

#[tokio::test]
async fn test_deadline_is_scheduled_by_the_store() {
    let store = store();
    let mut log = store.subscribe_actions();

    let start = start_request("SLOW").with_id("d1").with_timeout(Duration::from_millis(10));
    let mut deadline = store.send(start).await.unwrap();
    assert_eq!(deadline.pending(), 1);

    deadline.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(log.recv().await.unwrap().kind, ActionKind::Start);
    let cancel = log.recv().await.unwrap();
    assert_eq!(cancel.action_type(), "@@request/CANCEL/SLOW");
    assert_eq!(
        store.state(|s| s.status_of(&"d1".into())).await,
        Some(RequestStatus::Cancelled)
    );
}

#[tokio::test]
async fn test_result_within_deadline_survives_the_late_cancel() {
    let store = store();
    let mut log = store.subscribe_actions();

    let value = track_with_timeout(&store, "FAST", Duration::from_millis(20), async {
        Ok::<_, String>(7)
    })
    .await
    .unwrap();
    assert_eq!(value, 7);

    let kinds = [
        log.recv().await.unwrap().kind,
        log.recv().await.unwrap().kind,
        // The deadline's CANCEL lands later and is ignored.
        log.recv().await.unwrap().kind,
    ];
    assert_eq!(kinds, [ActionKind::Start, ActionKind::Succeed, ActionKind::Cancel]);
    store.shutdown(Duration::from_secs(1)).await.unwrap();

    let statuses: Vec<_> = store
        .state(|s| s.by_name("FAST").map(|m| m.status).collect())
        .await;
    assert_eq!(statuses, [RequestStatus::Success]);
}

#[tokio::test]
async fn test_track_after_shutdown_is_rejected() {
    let store = store();
    store.shutdown(Duration::from_millis(50)).await.unwrap();

    let result = track(&store, "FETCH", async { Ok::<_, String>(1) }).await;
    assert!(matches!(result, Err(TrackError::Store(_))));
}
