//! # Lifecycle Testing
//!
//! Testing utilities and helpers for lifecycle reducers.
//!
//! This crate provides:
//! - Deterministic implementations of Environment traits (clocks, id generators)
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Assertion helpers for effects
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use lifecycle_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(RequestReducer::new())
//!     .with_env(RequestEnvironment::new(Arc::new(test_clock())))
//!     .given_state(RequestState::new())
//!     .when_action(start_request("FETCH_USER").with_id("X"))
//!     .then_state(|state| assert!(state.contains(&"X".into())))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use lifecycle_core::environment::{Clock, IdGenerator};


pub use reducer_test::{ReducerTest, assertions};

/// Deterministic implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use lifecycle_testing::mocks::FixedClock;
    /// use lifecycle_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::from_timestamp_millis(TEST_EPOCH_MILLIS).unwrap_or_default(),
        )
    }

    /// 2025-01-01T00:00:00Z in epoch milliseconds
    pub const TEST_EPOCH_MILLIS: i64 = 1_735_689_600_000;

    /// Clock that only moves when told to
    ///
    /// Shareable behind an `Arc` so a test can advance time between folds.
    ///
    /// ```
    /// use lifecycle_testing::mocks::ManualClock;
    /// use lifecycle_core::environment::Clock;
    ///
    /// let clock = ManualClock::starting_at(1_000);
    /// clock.advance_millis(250);
    /// assert_eq!(clock.now_millis(), 1_250);
    /// ```
    #[derive(Debug)]
    pub struct ManualClock {
        millis: AtomicI64,
    }

    impl ManualClock {
        /// Create a clock reading `millis` since the Unix epoch
        #[must_use]
        pub const fn starting_at(millis: i64) -> Self {
            Self {
                millis: AtomicI64::new(millis),
            }
        }

        /// Move the clock forward
        pub fn advance_millis(&self, millis: i64) {
            self.millis.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::starting_at(TEST_EPOCH_MILLIS)
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.now_millis()).unwrap_or_default()
        }

        fn now_millis(&self) -> i64 {
            self.millis.load(Ordering::SeqCst)
        }
    }

    /// Predictable identifiers: `<prefix>-1`, `<prefix>-2`, ...
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        prefix: String,
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Create a generator with the given prefix
        #[must_use]
        pub fn new(prefix: impl Into<String>) -> Self {
            Self {
                prefix: prefix.into(),
                next: AtomicU64::new(1),
            }
        }
    }

    impl Default for SequentialIdGenerator {
        fn default() -> Self {
            Self::new("req")
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            format!("{}-{n}", self.prefix)
        }
    }
}

/// Property-based testing strategies
pub mod properties {
    use proptest::prelude::*;

    /// Operation names in the `SCREAMING_SNAKE_CASE` style used for requests
    pub fn request_name() -> impl Strategy<Value = String> {
        "[A-Z][A-Z_]{0,15}"
    }

    /// Explicit request identifiers
    pub fn request_id() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,12}"
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, SequentialIdGenerator, test_clock};
