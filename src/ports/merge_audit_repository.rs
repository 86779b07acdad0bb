//! Merge audit repository port (read side).
//!
//! Audits are written by `IdentityGraphStore::commit` in the same unit of
//! work as the merge itself; this port only reads them back.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MergeId, PersonId};
use crate::domain::merge::MergeAudit;

#[async_trait]
pub trait MergeAuditRepository: Send + Sync {
    /// Find an audit by merge id.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &MergeId) -> Result<Option<MergeAudit>, DomainError>;

    /// Audits where the person was either side of the merge, oldest first.
    async fn find_by_person(&self, person: &PersonId) -> Result<Vec<MergeAudit>, DomainError>;
}
