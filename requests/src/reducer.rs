//! Reducer folding request actions into [`RequestState`].
//!
//! Transitions follow [`RequestStatus::transition`]. Anything else is
//! ignored: unknown ids (except `CREATE`/`START`), terminal entries, and
//! repeated starts leave state untouched.
//!
//! The only effect is a deadline: an applied `START` carrying a timeout
//! schedules a `CANCEL` for the same request. If the request settles first,
//! that `CANCEL` is folded later and ignored like any late transition.

use crate::action::{ActionKind, RequestAction, cancel_request, duration_millis};
use crate::state::RequestState;
use crate::types::{RequestMeta, RequestStatus};
use lifecycle_core::{SmallVec, effect::Effect, environment::Clock, reducer::Reducer};
use serde_json::{Value, json};
use std::sync::Arc;

/// Environment dependencies for the request reducer
#[derive(Clone)]
pub struct RequestEnvironment {
    /// Clock for transition timestamps
    pub clock: Arc<dyn Clock>,
}

impl RequestEnvironment {
    /// Creates a new `RequestEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

/// Reducer for tracked requests
#[derive(Clone, Debug, Default)]
pub struct RequestReducer;

impl RequestReducer {
    /// Creates a new `RequestReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn insert(state: &mut RequestState, action: RequestAction, now: i64) {
        let RequestAction {
            kind,
            id,
            name,
            payload,
            timeout: _,
        } = action;

        let mut meta = RequestMeta::new(id.clone(), name.unwrap_or_default());
        meta.payload = payload;
        if kind == ActionKind::Start {
            meta.enter(RequestStatus::Loading, now);
        }

        tracing::debug!(%id, status = %meta.status, "Tracking request");
        state.requests.insert(id, meta);
    }

    /// Delayed `CANCEL` enforcing the deadline of a `START` record
    fn deadline(action: &RequestAction) -> Option<Effect<RequestAction>> {
        let timeout = action.timeout.filter(|_| action.kind == ActionKind::Start)?;
        let mut cancel = cancel_request(action.id.clone()).with_payload(json!({
            "reason": "timeout",
            "timeout_ms": duration_millis(timeout),
        }));
        cancel.name.clone_from(&action.name);
        Some(Effect::delay(timeout, cancel))
    }

    fn ignore(action: &RequestAction, reason: &'static str) {
        tracing::debug!(
            id = %action.id,
            action_type = %action.action_type(),
            reason,
            "Ignored request action"
        );
    }
}

impl Reducer for RequestReducer {
    type State = RequestState;
    type Action = RequestAction;
    type Environment = RequestEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if action.kind == ActionKind::Remove {
            if state.requests.remove(&action.id).is_none() {
                Self::ignore(&action, "unknown id");
            }
            return SmallVec::new();
        }

        let now = env.clock.now_millis();
        let deadline = Self::deadline(&action);

        let Some(meta) = state.requests.get_mut(&action.id) else {
            match action.kind {
                ActionKind::Create => Self::insert(state, action, now),
                ActionKind::Start => {
                    Self::insert(state, action, now);
                    return deadline.into_iter().collect();
                },
                ActionKind::Succeed
                | ActionKind::Fail
                | ActionKind::Cancel
                | ActionKind::Remove => Self::ignore(&action, "unknown id"),
            }
            return SmallVec::new();
        };

        let Some(next) = meta.status.transition(action.kind) else {
            Self::ignore(&action, "not allowed from current status");
            return SmallVec::new();
        };

        meta.enter(next, now);
        match next {
            RequestStatus::Failure => {
                meta.error = Some(action.payload.unwrap_or(Value::Null));
            },
            RequestStatus::NotStarted
            | RequestStatus::Loading
            | RequestStatus::Success
            | RequestStatus::Cancelled => {
                if action.payload.is_some() {
                    meta.payload = action.payload;
                }
            },
        }

        tracing::debug!(id = %meta.id, status = %next, "Request transitioned");
        if next == RequestStatus::Loading {
            return deadline.into_iter().collect();
        }
        SmallVec::new()
    }
}
