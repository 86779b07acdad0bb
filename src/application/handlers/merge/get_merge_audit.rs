//! GetMergeAuditHandler - Query handler for sealed merge audits.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, MergeId, PersonId};
use crate::domain::merge::MergeAudit;
use crate::ports::MergeAuditRepository;

/// Query for one merge audit.
#[derive(Debug, Clone, Copy)]
pub struct GetMergeAuditQuery {
    pub merge_id: MergeId,
}

/// Query for every merge an identity took part in.
#[derive(Debug, Clone, Copy)]
pub struct ListPersonMergesQuery {
    pub person_id: PersonId,
}

/// Handler for reading merge audits.
pub struct GetMergeAuditHandler {
    repository: Arc<dyn MergeAuditRepository>,
}

impl GetMergeAuditHandler {
    pub fn new(repository: Arc<dyn MergeAuditRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: GetMergeAuditQuery) -> Result<MergeAudit, DomainError> {
        self.repository
            .find_by_id(&query.merge_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::MergeNotFound,
                    format!("Merge not found: {}", query.merge_id),
                )
                .with_detail("merge_id", query.merge_id.to_string())
            })
    }

    /// Oldest first; empty when the identity was never merged.
    pub async fn list_for_person(
        &self,
        query: ListPersonMergesQuery,
    ) -> Result<Vec<MergeAudit>, DomainError> {
        self.repository.find_by_person(&query.person_id).await
    }
}
