//! Search indexer that records reindex requests.
//!
//! Stands in for the external search subsystem in tests, which assert on
//! the recorded requests.
//!
//! # Panics
//!
//! Uses `.expect()` on lock operations, which panics if a lock is poisoned.

use async_trait::async_trait;
use std::sync::RwLock;
use tracing::info;

use crate::domain::foundation::{DomainError, ErrorCode, PersonId};
use crate::ports::SearchIndexer;

#[derive(Debug, Default)]
pub struct RecordingSearchIndexer {
    requests: RwLock<Vec<PersonId>>,
    failing: RwLock<bool>,
}

impl RecordingSearchIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent reindex fail.
    pub fn set_failing(&self, failing: bool) {
        *self
            .failing
            .write()
            .expect("RecordingSearchIndexer: failing lock poisoned") = failing;
    }

    /// Ids reindexed so far, in request order.
    pub fn reindexed(&self) -> Vec<PersonId> {
        self.requests
            .read()
            .expect("RecordingSearchIndexer: requests lock poisoned")
            .clone()
    }
}

#[async_trait]
impl SearchIndexer for RecordingSearchIndexer {
    async fn reindex(&self, person: &PersonId) -> Result<(), DomainError> {
        if *self
            .failing
            .read()
            .expect("RecordingSearchIndexer: failing lock poisoned")
        {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                "Search index unavailable",
            ));
        }

        info!(person_id = %person, "Reindex requested");
        self.requests
            .write()
            .expect("RecordingSearchIndexer: requests lock poisoned")
            .push(*person);
        Ok(())
    }
}
