//! Search indexer port.
//!
//! Merges ask for both identities to be reindexed after commit. Failures are
//! logged by the caller and never undo a merge.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PersonId};

#[async_trait]
pub trait SearchIndexer: Send + Sync {
    /// Refresh the search entry of one person.
    async fn reindex(&self, person: &PersonId) -> Result<(), DomainError>;
}
