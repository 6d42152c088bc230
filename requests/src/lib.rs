//! Lifecycle tracking for named asynchronous requests.
//!
//! Each request moves through `NOT_STARTED → LOADING → SUCCESS | FAILURE | CANCELLED`.
//! Pure creator functions describe those moves as [`RequestAction`] records;
//! [`RequestReducer`] folds them into a [`RequestState`] keyed by request id.
//!
//! - Creators never fail and never touch state.
//! - The reducer ignores anything the state machine does not allow
//!   (unknown ids, terminal entries), so late or duplicated records are harmless.
//! - Retries are new requests with new ids.
//! - A `START` may carry a deadline; the reducer answers it with a delayed
//!   `CANCEL`, which the store folds when the deadline elapses.
//!
//! # Quick Start
//!
//! ```no_run
//! use lifecycle_core::environment::SystemClock;
//! use lifecycle_requests::{
//!     RequestEnvironment, RequestReducer, RequestState, RequestStatus, create_request,
//!     start_created, succeed_request,
//! };
//! use lifecycle_runtime::Store;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = RequestEnvironment::new(Arc::new(SystemClock));
//! let store = Store::new(RequestState::new(), RequestReducer::new(), env);
//!
//! let created = create_request("FETCH_USER");
//! let id = created.id.clone();
//! store.send(created.clone()).await?;
//! store.send(start_created(&created)).await?;
//! store.send(succeed_request(id.clone()).with_payload(42)).await?;
//!
//! let status = store.state(|s| s.status_of(&id)).await;
//! assert_eq!(status, Some(RequestStatus::Success));
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod reducer;
pub mod state;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use action::{
    ActionKind, REQUEST_NAMESPACE, RecordError, RequestAction, RequestActions, cancel_request,
    create_and_start_request, create_request, fail_request, remove_request, start_created,
    start_request, succeed_request,
};
pub use reducer::{RequestEnvironment, RequestReducer};
pub use state::RequestState;
pub use transport::{RequestStore, TrackError, track, track_as, track_with_timeout};
pub use types::{RequestId, RequestMeta, RequestStatus};
