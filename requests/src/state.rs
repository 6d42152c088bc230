//! Store state: every tracked request, keyed by id.

use crate::types::{RequestId, RequestMeta, RequestStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All tracked requests
///
/// Keyed by id, never by name: several requests sharing a name are
/// independent entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestState {
    /// Tracked requests indexed by id
    pub requests: HashMap<RequestId, RequestMeta>,
}

impl RequestState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked requests
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether nothing is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Returns a request by id
    #[must_use]
    pub fn get(&self, id: &RequestId) -> Option<&RequestMeta> {
        self.requests.get(id)
    }

    /// Whether `id` is tracked
    #[must_use]
    pub fn contains(&self, id: &RequestId) -> bool {
        self.requests.contains_key(id)
    }

    /// Status of a tracked request
    #[must_use]
    pub fn status_of(&self, id: &RequestId) -> Option<RequestStatus> {
        self.requests.get(id).map(|meta| meta.status)
    }

    /// Status of `id`, treating untracked requests as not started
    #[must_use]
    pub fn effective_status(&self, id: &RequestId) -> RequestStatus {
        self.status_of(id).unwrap_or(RequestStatus::NotStarted)
    }

    /// All requests with the given name
    ///
    /// Yielded entries borrow from the state only, not from `name`.
    pub fn by_name<'s>(&'s self, name: &str) -> impl Iterator<Item = &'s RequestMeta> {
        self.requests.values().filter(move |meta| meta.name == name)
    }

    /// The request with the given name that moved most recently
    ///
    /// Ties (and entries that never moved) are broken by id so the answer
    /// does not depend on map iteration order.
    #[must_use]
    pub fn latest_by_name(&self, name: &str) -> Option<&RequestMeta> {
        self.by_name(name)
            .max_by(|a, b| {
                a.last_transition_at()
                    .cmp(&b.last_transition_at())
                    .then_with(|| a.id.cmp(&b.id))
            })
    }

    /// Requests currently loading
    pub fn in_flight(&self) -> impl Iterator<Item = &RequestMeta> {
        self.requests
            .values()
            .filter(|meta| meta.status == RequestStatus::Loading)
    }

    /// Whether any request with the given name is loading
    #[must_use]
    pub fn is_loading(&self, name: &str) -> bool {
        self.by_name(name)
            .any(|meta| meta.status == RequestStatus::Loading)
    }
}
