//! Data model for tracked requests.
//!
//! A request is one logical asynchronous operation, identified by a
//! [`RequestId`] and labelled with a human-readable name. Its progress is a
//! [`RequestStatus`] plus the time each status was entered.

use crate::action::ActionKind;
use lifecycle_core::environment::{IdGenerator, UuidGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Unique identifier for a tracked request
///
/// Generated ids are UUID v4 strings; explicit ids may be any string the
/// caller wants to correlate on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new random `RequestId`
    #[must_use]
    pub fn new() -> Self {
        Self::generate(&UuidGenerator)
    }

    /// Creates a `RequestId` from the given id source
    #[must_use]
    pub fn generate(generator: &dyn IdGenerator) -> Self {
        Self(generator.next_id())
    }

    /// Returns the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<&RequestId> for RequestId {
    fn from(id: &RequestId) -> Self {
        id.clone()
    }
}

/// Where a request is in its lifecycle
///
/// `Success`, `Failure` and `Cancelled` are terminal: only removal can
/// touch an entry once it reaches one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Declared but not started
    NotStarted,
    /// Operation in flight
    Loading,
    /// Completed with a result
    Success,
    /// Completed with an error
    Failure,
    /// Aborted before completing
    Cancelled,
}

impl RequestStatus {
    /// Every status, in lifecycle order
    pub const ALL: [Self; 5] = [
        Self::NotStarted,
        Self::Loading,
        Self::Success,
        Self::Failure,
        Self::Cancelled,
    ];

    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Loading => "LOADING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether no further transition (other than removal) is allowed
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        match self {
            Self::NotStarted | Self::Loading => false,
            Self::Success | Self::Failure | Self::Cancelled => true,
        }
    }

    /// The status an entry moves to when `kind` is folded, if the move is legal
    ///
    /// `Create` and `Remove` never move an existing entry: creation only
    /// applies to absent entries and removal deletes instead of transitioning.
    #[must_use]
    pub const fn transition(self, kind: ActionKind) -> Option<Self> {
        match self {
            Self::NotStarted => match kind {
                ActionKind::Start => Some(Self::Loading),
                ActionKind::Cancel => Some(Self::Cancelled),
                ActionKind::Create
                | ActionKind::Succeed
                | ActionKind::Fail
                | ActionKind::Remove => None,
            },
            Self::Loading => match kind {
                ActionKind::Succeed => Some(Self::Success),
                ActionKind::Fail => Some(Self::Failure),
                ActionKind::Cancel => Some(Self::Cancelled),
                ActionKind::Create | ActionKind::Start | ActionKind::Remove => None,
            },
            Self::Success | Self::Failure | Self::Cancelled => None,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked asynchronous operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Binding key; never rewritten after insertion
    pub id: RequestId,
    /// Logical operation name, e.g. `DELETE_USER`
    pub name: String,
    /// Current lifecycle status
    pub status: RequestStatus,
    /// Error carried by the `FAIL` record; only set when `status == Failure`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Latest payload carried by an applied transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Epoch milliseconds at which each status was entered
    #[serde(default)]
    pub timestamp: BTreeMap<RequestStatus, i64>,
}

impl RequestMeta {
    /// A declared request that has not started yet
    #[must_use]
    pub fn new(id: RequestId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: RequestStatus::NotStarted,
            error: None,
            payload: None,
            timestamp: BTreeMap::new(),
        }
    }

    /// When `status` was entered, if it ever was
    #[must_use]
    pub fn entered_at(&self, status: RequestStatus) -> Option<i64> {
        self.timestamp.get(&status).copied()
    }

    /// Most recent recorded transition time
    #[must_use]
    pub fn last_transition_at(&self) -> Option<i64> {
        self.timestamp.values().copied().max()
    }

    /// Whether the request reached a terminal status
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The success payload, if the request succeeded
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        match self.status {
            RequestStatus::Success => self.payload.as_ref(),
            RequestStatus::NotStarted
            | RequestStatus::Loading
            | RequestStatus::Failure
            | RequestStatus::Cancelled => None,
        }
    }

    /// Move to `status`, stamping the entry time once
    pub(crate) fn enter(&mut self, status: RequestStatus, at: i64) {
        self.status = status;
        self.timestamp.entry(status).or_insert(at);
    }
}
