//! Drive a real asynchronous operation through the tracker.
//!
//! These helpers play the transport role: they dispatch `START`, run the
//! operation, and report the outcome as `SUCCEED` or `FAIL`. Every `START`
//! is settled by one of those two records, even when the result cannot be
//! encoded. Cancellation is cooperative: if a `CANCEL` was folded while the
//! operation ran, the reducer ignores the report and the caller gets
//! [`TrackError::Cancelled`].

use crate::action::{RequestAction, fail_request, start_request, succeed_request};
use crate::reducer::{RequestEnvironment, RequestReducer};
use crate::state::RequestState;
use crate::types::{RequestId, RequestStatus};
use lifecycle_runtime::{Store, StoreError};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Store specialised to request tracking
pub type RequestStore = Store<RequestState, RequestAction, RequestEnvironment, RequestReducer>;

/// Why a tracked operation did not produce a value
#[derive(Error, Debug)]
pub enum TrackError {
    /// The store rejected an action
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The result could not be turned into a payload (reported as `FAIL`)
    #[error("failed to encode result of request {id}: {source}")]
    Encode {
        /// Request whose result failed to encode
        id: RequestId,
        /// Underlying serializer error
        #[source]
        source: serde_json::Error,
    },

    /// The operation itself failed
    #[error("request {id} failed: {message}")]
    Failed {
        /// Failed request
        id: RequestId,
        /// Error reported by the operation
        message: String,
    },

    /// The request was cancelled before the operation finished
    #[error("request {id} was cancelled")]
    Cancelled {
        /// Cancelled request
        id: RequestId,
    },

    /// The operation exceeded its deadline and was cancelled
    #[error("request {id} timed out after {timeout:?}")]
    TimedOut {
        /// Timed out request
        id: RequestId,
        /// Deadline that elapsed
        timeout: Duration,
    },
}

/// Track `operation` as a new request named `name`
///
/// # Errors
///
/// See [`track_as`].
pub async fn track<T, E, Fut>(
    store: &RequestStore,
    name: impl Into<String>,
    operation: Fut,
) -> Result<T, TrackError>
where
    T: Serialize,
    E: std::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
{
    track_as(store, start_request(name), operation).await
}

/// Track `operation` under a caller-built `START` record
///
/// Use this to pick the id up front, e.g. with
/// [`start_created`](crate::start_created) or `start_request(name).with_id(..)`.
///
/// # Errors
///
/// - [`TrackError::Store`] if the store is shutting down
/// - [`TrackError::Failed`] if the operation returned an error (reported as `FAIL`)
/// - [`TrackError::Cancelled`] if the entry was cancelled meanwhile
/// - [`TrackError::Encode`] if the result cannot be serialized
#[tracing::instrument(skip_all, fields(id = %start.id))]
pub async fn track_as<T, E, Fut>(
    store: &RequestStore,
    start: RequestAction,
    operation: Fut,
) -> Result<T, TrackError>
where
    T: Serialize,
    E: std::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
{
    let id = start.id.clone();
    let name = start.name.clone();

    store.send(start).await?;
    let outcome = operation.await;
    settle(store, id, name, outcome.map_err(|e| e.to_string())).await
}

/// Track `operation`, cancelling the request if it runs past `timeout`
///
/// The deadline travels on the `START` record, so the store itself schedules
/// the `CANCEL` and every observer of the action log sees it. If the operation
/// wins the race, that `CANCEL` still lands at the deadline and is ignored.
///
/// # Errors
///
/// As [`track_as`], plus [`TrackError::TimedOut`] when the deadline elapses.
#[tracing::instrument(skip_all, fields(?timeout))]
pub async fn track_with_timeout<T, E, Fut>(
    store: &RequestStore,
    name: impl Into<String>,
    timeout: Duration,
    operation: Fut,
) -> Result<T, TrackError>
where
    T: Serialize,
    E: std::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
{
    let start = start_request(name).with_timeout(timeout);
    let id = start.id.clone();
    let name = start.name.clone();

    let mut deadline = store.send(start).await?;

    tokio::select! {
        outcome = operation => settle(store, id, name, outcome.map_err(|e| e.to_string())).await,
        () = deadline.wait() => {
            tracing::warn!(%id, "Request timed out and was cancelled");
            Err(TrackError::TimedOut { id, timeout })
        },
    }
}

/// Report `outcome` as `SUCCEED` or `FAIL`, then check it was applied
///
/// A `CANCEL` folded before the report makes the reducer ignore it; the
/// caller then gets [`TrackError::Cancelled`] instead of the outcome.
async fn settle<T: Serialize>(
    store: &RequestStore,
    id: RequestId,
    name: Option<String>,
    outcome: Result<T, String>,
) -> Result<T, TrackError> {
    let (mut report, result) = match outcome {
        Ok(value) => match serde_json::to_value(&value) {
            Ok(payload) => (succeed_request(id.clone()).with_payload(payload), Ok(value)),
            Err(source) => {
                tracing::warn!(%id, %source, "Could not encode result, reporting failure");
                let fail = fail_request(id.clone(), json!({ "message": source.to_string() }));
                (fail, Err(TrackError::Encode { id: id.clone(), source }))
            },
        },
        Err(message) => {
            let fail = fail_request(id.clone(), json!({ "message": message }));
            (fail, Err(TrackError::Failed { id: id.clone(), message }))
        },
    };
    report.name = name;
    store.send(report).await?;

    if store.state(|s| s.status_of(&id)).await == Some(RequestStatus::Cancelled) {
        tracing::debug!(%id, "Request was cancelled while running, outcome dropped");
        return Err(TrackError::Cancelled { id });
    }
    result
}
