//! Identity locker port.
//!
//! Serialises merges (and anything else that takes the same locks) touching
//! the same identities. Locks are always taken in ascending id order so two
//! merges of the same pair in opposite directions cannot deadlock.

use async_trait::async_trait;
use std::fmt;

use crate::domain::foundation::{DomainError, PersonId};

/// Exclusive hold on a set of identities; dropping it releases them.
pub struct IdentityLease {
    ids: Vec<PersonId>,
    _guards: Vec<Box<dyn Send + Sync>>,
}

impl IdentityLease {
    pub fn new(ids: Vec<PersonId>, guards: Vec<Box<dyn Send + Sync>>) -> Self {
        Self {
            ids,
            _guards: guards,
        }
    }

    /// Locked ids, in the order they were taken.
    pub fn ids(&self) -> &[PersonId] {
        &self.ids
    }
}

impl fmt::Debug for IdentityLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityLease").field("ids", &self.ids).finish()
    }
}

#[async_trait]
pub trait IdentityLocker: Send + Sync {
    /// Locks every id, ascending, waiting for holders to release.
    ///
    /// # Errors
    ///
    /// - `LockUnavailable` if the locks cannot be taken in time
    async fn lock(&self, ids: &[PersonId]) -> Result<IdentityLease, DomainError>;
}
