//! Search indexer that only logs reindex requests.
//!
//! Used by the binary when no search subsystem is wired in. Keeps no state.

use async_trait::async_trait;
use tracing::info;

use crate::domain::foundation::{DomainError, PersonId};
use crate::ports::SearchIndexer;

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSearchIndexer;

impl LoggingSearchIndexer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchIndexer for LoggingSearchIndexer {
    async fn reindex(&self, person: &PersonId) -> Result<(), DomainError> {
        info!(person_id = %person, "Reindex requested");
        Ok(())
    }
}
