//! PostgreSQL implementation of MergeAuditRepository.
//!
//! Reads `person_merge_log`; rows are written by
//! `PostgresIdentityGraphStore::commit` in the merge transaction.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{DomainError, MergeId, PersonId};
use crate::domain::merge::MergeAudit;
use crate::ports::MergeAuditRepository;

/// PostgreSQL implementation of MergeAuditRepository.
#[derive(Clone)]
pub struct PostgresMergeAuditRepository {
    pool: PgPool,
}

impl PostgresMergeAuditRepository {
    /// Creates a new PostgresMergeAuditRepository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MergeAuditRepository for PostgresMergeAuditRepository {
    async fn find_by_id(&self, id: &MergeId) -> Result<Option<MergeAudit>, DomainError> {
        let row = sqlx::query("SELECT merged_data FROM person_merge_log WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch merge log: {}", e)))?;

        row.map(row_to_audit).transpose()
    }

    async fn find_by_person(&self, person: &PersonId) -> Result<Vec<MergeAudit>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT merged_data FROM person_merge_log
            WHERE preferred_id = $1 OR non_preferred_id = $1
            ORDER BY date_created ASC, id ASC
            "#,
        )
        .bind(person.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch merge log: {}", e)))?;

        rows.into_iter().map(row_to_audit).collect()
    }
}

fn row_to_audit(row: sqlx::postgres::PgRow) -> Result<MergeAudit, DomainError> {
    let Json(audit): Json<MergeAudit> = row
        .try_get("merged_data")
        .map_err(|e| DomainError::database(format!("Failed to decode merge audit: {}", e)))?;
    Ok(audit)
}
