//! Explicit acting-user and clock context.
//!
//! Every stamp a merge writes (creator, voided-by, date-voided, retirement)
//! comes from the `ActingUser` and `Clock` threaded through the call, never
//! from ambient session state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{Timestamp, ValidationError};

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActingUser(String);

impl ActingUser {
    /// Creates a new ActingUser, returning error if blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("acting_user"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActingUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock pinned to a single instant, for reproducible runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(Timestamp);

impl FixedClock {
    pub fn at(ts: Timestamp) -> Self {
        Self(ts)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Acting user plus clock, captured once per operation.
#[derive(Clone)]
pub struct OperationContext {
    pub user: ActingUser,
    clock: Arc<dyn Clock>,
    started_at: Timestamp,
}

impl OperationContext {
    /// Captures the start instant from `clock`.
    pub fn new(user: ActingUser, clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        Self {
            user,
            clock,
            started_at,
        }
    }

    /// The instant the operation started; used for every stamp it writes.
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Current time from the operation's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("user", &self.user)
            .field("started_at", &self.started_at)
            .finish()
    }
}
