//! Transition records and the pure functions that create them.
//!
//! Every record names the request it applies to and carries a `type` string
//! of the form `@@request/<ACTION>/<name>`, so an action log can be filtered
//! by kind or by request name independently.

use crate::types::RequestId;
use lifecycle_core::environment::{IdGenerator, UuidGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Namespace prefix of every request action `type`
pub const REQUEST_NAMESPACE: &str = "@@request";

/// The transition a record describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Declare a request without starting it
    Create,
    /// The operation has begun
    Start,
    /// The operation completed; payload is the result
    Succeed,
    /// The operation failed; payload is the error
    Fail,
    /// The operation was aborted
    Cancel,
    /// Forget the entry entirely
    Remove,
}

impl ActionKind {
    /// Every kind
    pub const ALL: [Self; 6] = [
        Self::Create,
        Self::Start,
        Self::Succeed,
        Self::Fail,
        Self::Cancel,
        Self::Remove,
    ];

    /// Segment used in the action `type`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Start => "START",
            Self::Succeed => "SUCCEED",
            Self::Fail => "FAIL",
            Self::Cancel => "CANCEL",
            Self::Remove => "REMOVE",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RecordError::UnknownAction(s.to_owned()))
    }
}

/// Errors decoding a record that crossed a process boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The `type` does not start with [`REQUEST_NAMESPACE`]
    #[error("action type {0:?} is not in the @@request namespace")]
    ForeignNamespace(String),

    /// The action segment is not one of the known kinds
    #[error("unknown request action {0:?}")]
    UnknownAction(String),

    /// The name in `type` disagrees with the `name` field
    #[error("action type names {in_type:?} but record names {in_field:?}")]
    NameMismatch {
        /// Name segment of the `type` string
        in_type: Option<String>,
        /// The `name` field
        in_field: Option<String>,
    },
}

/// An immutable transition record for one request
///
/// Records are produced by the creator functions in this module and folded
/// by [`RequestReducer`](crate::RequestReducer). On the wire they are flat
/// objects: `{"type": "@@request/START/FETCH_USER", "id": "...", "name": "FETCH_USER", "payload": ...}`,
/// plus `timeout_ms` on `START` records that carry a deadline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "ActionRecord", try_from = "ActionRecord")]
pub struct RequestAction {
    /// Transition kind
    pub kind: ActionKind,
    /// Request the record applies to
    pub id: RequestId,
    /// Logical request name
    pub name: Option<String>,
    /// Result, error, or input data depending on the kind
    pub payload: Option<Value>,
    /// Deadline after which a started request is cancelled (`START` only)
    pub timeout: Option<Duration>,
}

impl RequestAction {
    /// A record with no name and no payload
    #[must_use]
    pub fn new(kind: ActionKind, id: impl Into<RequestId>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: None,
            payload: None,
            timeout: None,
        }
    }

    /// Replace the request id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach the request name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a payload
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Cancel the request if it is still running after `timeout`
    ///
    /// Only meaningful on `START`; the reducer schedules the cancellation when
    /// the start is applied and ignores the deadline on every other kind.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The `<namespace>/<ACTION>/<name>` type string
    ///
    /// Records without a name render as `<namespace>/<ACTION>`.
    #[must_use]
    pub fn action_type(&self) -> String {
        match &self.name {
            Some(name) => format!("{REQUEST_NAMESPACE}/{}/{name}", self.kind),
            None => format!("{REQUEST_NAMESPACE}/{}", self.kind),
        }
    }
}

/// Flat wire form of a [`RequestAction`]
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ActionRecord {
    #[serde(rename = "type")]
    action_type: String,
    id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
}

impl From<RequestAction> for ActionRecord {
    fn from(action: RequestAction) -> Self {
        Self {
            action_type: action.action_type(),
            id: action.id,
            name: action.name,
            payload: action.payload,
            timeout_ms: action.timeout.map(duration_millis),
        }
    }
}

impl TryFrom<ActionRecord> for RequestAction {
    type Error = RecordError;

    fn try_from(record: ActionRecord) -> Result<Self, Self::Error> {
        let rest = record
            .action_type
            .strip_prefix(REQUEST_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| RecordError::ForeignNamespace(record.action_type.clone()))?;

        // Names may themselves contain '/', so only the first separator is structural.
        let (kind, name_in_type) = match rest.split_once('/') {
            Some((kind, name)) => (kind, Some(name)),
            None => (rest, None),
        };
        let kind = kind.parse::<ActionKind>()?;

        if record.name.is_some() && record.name.as_deref() != name_in_type {
            return Err(RecordError::NameMismatch {
                in_type: name_in_type.map(str::to_owned),
                in_field: record.name,
            });
        }

        Ok(Self {
            kind,
            id: record.id,
            name: name_in_type.map(str::to_owned),
            payload: record.payload,
            timeout: record.timeout_ms.map(Duration::from_millis),
        })
    }
}

/// Whole milliseconds in `duration`, saturating
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Action creators bound to an id source
///
/// The free functions in this module use random UUIDs; build a
/// `RequestActions` with a different [`IdGenerator`] when ids must be
/// predictable.
#[derive(Debug, Clone, Default)]
pub struct RequestActions<G = UuidGenerator> {
    ids: G,
}

impl<G: IdGenerator> RequestActions<G> {
    /// Creators drawing ids from `ids`
    #[must_use]
    pub const fn new(ids: G) -> Self {
        Self { ids }
    }

    fn fresh(&self, kind: ActionKind, name: impl Into<String>) -> RequestAction {
        RequestAction::new(kind, RequestId::generate(&self.ids)).with_name(name)
    }

    /// `CREATE` record with a fresh id
    #[must_use]
    pub fn create(&self, name: impl Into<String>) -> RequestAction {
        self.fresh(ActionKind::Create, name)
    }

    /// `START` record with a fresh id
    #[must_use]
    pub fn start(&self, name: impl Into<String>) -> RequestAction {
        self.fresh(ActionKind::Start, name)
    }

    /// `CREATE` and `START` records sharing one fresh id
    #[must_use]
    pub fn create_and_start(&self, name: impl Into<String>) -> (RequestAction, RequestAction) {
        let created = self.create(name);
        let started = start_created(&created);
        (created, started)
    }
}

/// Declare a request without starting it
///
/// A fresh id is generated per call; override it with
/// [`RequestAction::with_id`].
#[must_use]
pub fn create_request(name: impl Into<String>) -> RequestAction {
    RequestActions::<UuidGenerator>::default().create(name)
}

/// Signal that an operation has begun
///
/// A fresh id is generated per call. To start a request that was already
/// created, use [`start_created`] so the created id is kept.
#[must_use]
pub fn start_request(name: impl Into<String>) -> RequestAction {
    RequestActions::<UuidGenerator>::default().start(name)
}

/// `START` record bound to the id and name of an earlier `CREATE` record
#[must_use]
pub fn start_created(created: &RequestAction) -> RequestAction {
    RequestAction {
        kind: ActionKind::Start,
        id: created.id.clone(),
        name: created.name.clone(),
        payload: None,
        timeout: None,
    }
}

/// `CREATE` and `START` records for one new request
#[must_use]
pub fn create_and_start_request(name: impl Into<String>) -> (RequestAction, RequestAction) {
    RequestActions::<UuidGenerator>::default().create_and_start(name)
}

/// Signal successful completion; attach the result with `with_payload`
#[must_use]
pub fn succeed_request(id: impl Into<RequestId>) -> RequestAction {
    RequestAction::new(ActionKind::Succeed, id)
}

/// Signal failure with the error that caused it
#[must_use]
pub fn fail_request(id: impl Into<RequestId>, error: impl Into<Value>) -> RequestAction {
    RequestAction::new(ActionKind::Fail, id).with_payload(error)
}

/// Signal that the request was aborted before completing
///
/// This only marks the tracked status; stopping the underlying work is up to
/// whoever performs it.
#[must_use]
pub fn cancel_request(id: impl Into<RequestId>) -> RequestAction {
    RequestAction::new(ActionKind::Cancel, id)
}

/// Forget a tracked request
#[must_use]
pub fn remove_request(id: impl Into<RequestId>) -> RequestAction {
    RequestAction::new(ActionKind::Remove, id)
}
