//! Property tests for the request lifecycle state machine.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use lifecycle_core::reducer::Reducer;
use lifecycle_requests::{
    ActionKind, RequestAction, RequestEnvironment, RequestReducer, RequestState, RequestStatus,
    cancel_request, create_request, fail_request, remove_request, start_request, succeed_request,
};
use lifecycle_testing::properties::{request_id, request_name};
use lifecycle_testing::test_clock;
use proptest::prelude::*;
use std::sync::Arc;

fn env() -> RequestEnvironment {
    RequestEnvironment::new(Arc::new(test_clock()))
}

fn fold(state: &mut RequestState, actions: impl IntoIterator<Item = RequestAction>) {
    let reducer = RequestReducer::new();
    let env = env();
    for action in actions {
        let effects = reducer.reduce(state, action, &env);
        assert!(effects.is_empty());
    }
}

fn action_for(kind: ActionKind, id: &str, name: &str) -> RequestAction {
    match kind {
        ActionKind::Create => create_request(name).with_id(id),
        ActionKind::Start => start_request(name).with_id(id),
        ActionKind::Succeed => succeed_request(id).with_name(name).with_payload(1),
        ActionKind::Fail => fail_request(id, "boom").with_name(name),
        ActionKind::Cancel => cancel_request(id).with_name(name),
        ActionKind::Remove => remove_request(id),
    }
}

fn any_kind() -> impl Strategy<Value = ActionKind> {
    prop::sample::select(ActionKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn generated_ids_never_collide(name in request_name()) {
        let a = create_request(name.clone());
        let b = create_request(name);
        prop_assert_ne!(a.id, b.id);
    }

    #[test]
    fn start_after_create_is_loading(id in request_id(), name in request_name()) {
        let mut state = RequestState::new();
        fold(&mut state, [
            create_request(name.clone()).with_id(id.as_str()),
            start_request(name).with_id(id.as_str()).with_payload("input"),
        ]);

        let meta = state.get(&id.as_str().into()).unwrap();
        prop_assert_eq!(meta.id.as_str(), id.as_str());
        prop_assert_eq!(meta.status, RequestStatus::Loading);
        prop_assert!(meta.entered_at(RequestStatus::Loading).is_some());
    }

    #[test]
    fn transitions_on_unknown_ids_change_nothing(
        known in request_id(),
        name in request_name(),
        kind in prop::sample::select(vec![ActionKind::Succeed, ActionKind::Fail, ActionKind::Cancel, ActionKind::Remove]),
    ) {
        let mut state = RequestState::new();
        fold(&mut state, [start_request(name.clone()).with_id(known.as_str())]);
        let before = state.clone();

        fold(&mut state, [action_for(kind, &format!("{known}-unknown"), &name)]);
        prop_assert_eq!(state, before);
    }

    #[test]
    fn terminal_entries_only_accept_removal(
        id in request_id(),
        name in request_name(),
        terminal in prop::sample::select(vec![ActionKind::Succeed, ActionKind::Fail, ActionKind::Cancel]),
        kinds in prop::collection::vec(any_kind(), 1..8),
    ) {
        let mut state = RequestState::new();
        fold(&mut state, [
            start_request(name.clone()).with_id(id.as_str()),
            action_for(terminal, &id, &name),
        ]);
        let settled = state.clone();

        for kind in kinds {
            fold(&mut state, [action_for(kind, &id, &name)]);
            if kind == ActionKind::Remove {
                prop_assert!(state.is_empty());
                break;
            }
            prop_assert_eq!(&state, &settled);
        }
    }

    #[test]
    fn same_name_requests_are_independent(name in request_name(), count in 2usize..6) {
        let mut state = RequestState::new();
        let starts: Vec<_> = (0..count).map(|_| start_request(name.clone())).collect();
        let first = starts[0].id.clone();
        fold(&mut state, starts);
        fold(&mut state, [succeed_request(first.clone())]);

        prop_assert_eq!(state.len(), count);
        prop_assert_eq!(state.status_of(&first), Some(RequestStatus::Success));
        prop_assert_eq!(state.in_flight().count(), count - 1);
    }

    #[test]
    fn status_timestamps_are_never_rewritten(
        id in request_id(),
        name in request_name(),
        kinds in prop::collection::vec(any_kind(), 0..12),
    ) {
        let mut state = RequestState::new();
        let key = id.as_str().into();
        let mut seen = std::collections::BTreeMap::new();

        for kind in kinds {
            fold(&mut state, [action_for(kind, &id, &name)]);
            match state.get(&key) {
                Some(meta) => {
                    for (status, at) in &meta.timestamp {
                        let first = *seen.entry(*status).or_insert(*at);
                        prop_assert_eq!(first, *at);
                    }
                    prop_assert_eq!(meta.error.is_some(), meta.status == RequestStatus::Failure);
                },
                None => seen.clear(),
            }
        }
    }
}

#[test]
fn succeed_folded_twice_is_idempotent() {
    let mut state = RequestState::new();
    let succeed = succeed_request("X").with_name("FETCH").with_payload(42);

    fold(&mut state, [start_request("FETCH").with_id("X"), succeed.clone()]);
    let once = state.clone();
    fold(&mut state, [succeed]);

    assert_eq!(state, once);
    assert_eq!(state.status_of(&"X".into()), Some(RequestStatus::Success));
}

#[test]
fn remove_is_a_no_op_the_second_time() {
    let mut state = RequestState::new();
    fold(&mut state, [create_request("FETCH").with_id("X"), remove_request("X")]);
    assert!(state.is_empty());

    fold(&mut state, [remove_request("X")]);
    assert!(state.is_empty());
}

#[test]
fn records_survive_the_wire() {
    let records = [
        create_request("FETCH").with_id("X").with_payload(serde_json::json!({"q": "rust"})),
        start_request("FETCH").with_id("X"),
        start_request("FETCH").with_id("X").with_timeout(std::time::Duration::from_secs(3)),
        succeed_request("X").with_name("FETCH").with_payload(42),
        fail_request("X", "boom"),
        cancel_request("X").with_name("api/users"),
        remove_request("X"),
    ];

    for record in records {
        let json = serde_json::to_string(&record).unwrap();
        let parsed: RequestAction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record, "{json}");
    }
}
