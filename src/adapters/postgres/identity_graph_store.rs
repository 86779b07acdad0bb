//! PostgreSQL implementation of IdentityGraphStore.
//!
//! Each person is one JSONB document (`persons.graph`) holding the identity
//! and every record it owns. Relationships are stored once in their own
//! table and joined back on load. `patient_identifiers` indexes the
//! identifiers of every document for holder lookups and uniqueness checks.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, IdentifierId, IdentifierTypeId, LocationId, PersonId, Voidable,
};
use crate::domain::merge::{MergeAudit, MergeChangeset, PersonGraph};
use crate::domain::person::{
    IdentifierHolding, IdentifierType, PatientIdentifier, Relationship, UniquenessBehavior,
};
use crate::ports::IdentityGraphStore;

/// PostgreSQL implementation of IdentityGraphStore.
#[derive(Clone)]
pub struct PostgresIdentityGraphStore {
    pool: PgPool,
}

impl PostgresIdentityGraphStore {
    /// Creates a new PostgresIdentityGraphStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores (or replaces) a person graph outside of any merge. Replacing
    /// an existing person bumps its version, so a merge that loaded the old
    /// copy can no longer commit.
    pub async fn save_graph(&self, graph: &PersonGraph) -> Result<(), DomainError> {
        let mut tx = begin(&self.pool).await?;
        let current = lock_versions(&mut tx, &[graph.id()]).await?;
        let version = current.get(&graph.id()).map_or(0, |v| v + 1);
        for identifier in &graph.person.identifiers {
            ensure_identifier_type(&mut tx, &identifier.identifier_type).await?;
        }
        write_graph(&mut tx, graph, version).await?;
        commit(tx).await
    }
}

#[async_trait]
impl IdentityGraphStore for PostgresIdentityGraphStore {
    async fn load_graph(&self, id: &PersonId) -> Result<Option<PersonGraph>, DomainError> {
        let row = sqlx::query("SELECT graph, version FROM persons WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch person: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let Json(mut graph): Json<PersonGraph> = row.try_get("graph").map_err(|e| {
            DomainError::database(format!("Failed to decode person graph: {}", e))
        })?;
        let version: i64 = row
            .try_get("version")
            .map_err(|e| DomainError::database(format!("Failed to get version: {}", e)))?;
        graph.person.version = from_db_version(version);

        let rows = sqlx::query(
            r#"
            SELECT data FROM relationships
            WHERE person_a = $1 OR person_b = $1
            ORDER BY id
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch relationships: {}", e)))?;

        graph.relationships = rows
            .into_iter()
            .map(|row| {
                row.try_get::<Json<Relationship>, _>("data")
                    .map(|Json(r)| r)
                    .map_err(|e| DomainError::database(format!("Failed to decode relationship: {}", e)))
            })
            .collect::<Result<_, _>>()?;

        Ok(Some(graph))
    }

    async fn find_identifier_holders(
        &self,
        identifier_type: &IdentifierTypeId,
        identifier: &str,
    ) -> Result<Vec<IdentifierHolding>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT pi.id, pi.person_id, p.is_patient, pi.identifier,
                   pi.identifier_type_id, pi.location_id, pi.voided
            FROM patient_identifiers pi
            JOIN persons p ON p.id = pi.person_id
            WHERE pi.identifier_type_id = $1 AND pi.identifier = $2
            ORDER BY pi.person_id
            "#,
        )
        .bind(identifier_type.as_uuid())
        .bind(identifier)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch identifier holders: {}", e)))?;

        rows.into_iter().map(row_to_holding).collect()
    }

    async fn identifier_type(
        &self,
        id: &IdentifierTypeId,
    ) -> Result<Option<IdentifierType>, DomainError> {
        let row = sqlx::query("SELECT id, name, uniqueness FROM identifier_types WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch identifier type: {}", e)))?;

        row.map(row_to_identifier_type).transpose()
    }

    async fn commit(&self, changeset: MergeChangeset) -> Result<(), DomainError> {
        let mut tx = begin(&self.pool).await?;

        let current = lock_versions(
            &mut tx,
            &[changeset.preferred.id(), changeset.non_preferred.id()],
        )
        .await?;
        for graph in changeset.graphs() {
            check_version(graph, current.get(&graph.id()).copied())?;
        }

        for graph in changeset.graphs() {
            for identifier in &graph.person.identifiers {
                ensure_identifier_type(&mut tx, &identifier.identifier_type).await?;
            }
        }
        for graph in changeset.graphs() {
            write_graph(&mut tx, graph, to_db_version(graph.person.version) + 1).await?;
        }
        for (holder, identifier) in changeset.live_identifiers() {
            check_unique(&mut tx, holder, identifier).await?;
        }
        insert_audit(&mut tx, &changeset.audit).await?;

        // Dropping `tx` on any early return above rolls everything back.
        commit(tx).await?;
        info!(merge_id = %changeset.audit.id(), "Merge changeset committed");
        Ok(())
    }
}

async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>, DomainError> {
    pool.begin()
        .await
        .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), DomainError> {
    tx.commit()
        .await
        .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))
}

/// Locks the person rows in id order and returns their stored versions.
async fn lock_versions(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[PersonId],
) -> Result<HashMap<PersonId, i64>, DomainError> {
    let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
    let rows = sqlx::query("SELECT id, version FROM persons WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(&uuids[..])
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to lock persons: {}", e)))?;

    rows.into_iter()
        .map(|row| {
            let id: Uuid = row
                .try_get("id")
                .map_err(|e| DomainError::database(format!("Failed to get id: {}", e)))?;
            let version: i64 = row
                .try_get("version")
                .map_err(|e| DomainError::database(format!("Failed to get version: {}", e)))?;
            Ok((PersonId::from_uuid(id), version))
        })
        .collect()
}

/// Fails unless the graph was loaded at the stored version. A person with
/// no row yet counts as version 0.
fn check_version(graph: &PersonGraph, stored: Option<i64>) -> Result<(), DomainError> {
    let stored = stored.unwrap_or(0);
    if stored == to_db_version(graph.person.version) {
        return Ok(());
    }
    Err(DomainError::new(
        ErrorCode::ConcurrentModification,
        format!(
            "Person {} was modified concurrently (loaded version {}, stored version {})",
            graph.id(),
            graph.person.version,
            stored
        ),
    )
    .with_detail("person_id", graph.id().to_string()))
}

fn to_db_version(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

fn from_db_version(version: i64) -> u64 {
    u64::try_from(version).unwrap_or(0)
}

/// Registers an identifier type on first sight. Metadata that differs from
/// the stored row is written through unless the type is locked.
async fn ensure_identifier_type(
    tx: &mut Transaction<'_, Postgres>,
    kind: &IdentifierType,
) -> Result<(), DomainError> {
    let row = sqlx::query(
        "SELECT id, name, uniqueness, locked FROM identifier_types WHERE id = $1 FOR UPDATE",
    )
    .bind(kind.id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| DomainError::database(format!("Failed to fetch identifier type: {}", e)))?;

    let Some(row) = row else {
        sqlx::query("INSERT INTO identifier_types (id, name, uniqueness) VALUES ($1, $2, $3)")
            .bind(kind.id.as_uuid())
            .bind(&kind.name)
            .bind(uniqueness_to_str(kind.uniqueness))
            .execute(&mut **tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to insert identifier type: {}", e)))?;
        return Ok(());
    };

    let locked: bool = row
        .try_get("locked")
        .map_err(|e| DomainError::database(format!("Failed to get locked: {}", e)))?;
    let stored = row_to_identifier_type(row)?;
    if stored == *kind {
        return Ok(());
    }
    if locked {
        return Err(DomainError::new(
            ErrorCode::ConfigurationLocked,
            format!("Identifier type '{}' is locked", stored.name),
        )
        .with_detail("identifier_type", kind.id.to_string()));
    }

    debug!(identifier_type = %kind.id, "Updating identifier type metadata");
    sqlx::query("UPDATE identifier_types SET name = $2, uniqueness = $3 WHERE id = $1")
        .bind(kind.id.as_uuid())
        .bind(&kind.name)
        .bind(uniqueness_to_str(kind.uniqueness))
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update identifier type: {}", e)))?;
    Ok(())
}

/// Upserts the person document, its relationships and its identifier index rows.
async fn write_graph(
    tx: &mut Transaction<'_, Postgres>,
    graph: &PersonGraph,
    version: i64,
) -> Result<(), DomainError> {
    let person = &graph.person;
    let mut document = graph.clone();
    document.relationships.clear();
    document.person.version = from_db_version(version);

    sqlx::query(
        r#"
        INSERT INTO persons (id, is_patient, voided, graph, version, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        ON CONFLICT (id) DO UPDATE SET
            is_patient = EXCLUDED.is_patient,
            voided = EXCLUDED.voided,
            graph = EXCLUDED.graph,
            version = EXCLUDED.version,
            updated_at = NOW()
        "#,
    )
    .bind(person.id.as_uuid())
    .bind(person.is_patient)
    .bind(person.is_voided())
    .bind(Json(&document))
    .bind(version)
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::database(format!("Failed to upsert person: {}", e)))?;

    for relationship in &graph.relationships {
        sqlx::query(
            r#"
            INSERT INTO relationships (id, person_a, person_b, voided, data)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                person_a = EXCLUDED.person_a,
                person_b = EXCLUDED.person_b,
                voided = EXCLUDED.voided,
                data = EXCLUDED.data
            "#,
        )
        .bind(relationship.id.as_uuid())
        .bind(relationship.person_a.as_uuid())
        .bind(relationship.person_b.as_uuid())
        .bind(relationship.is_voided())
        .bind(Json(relationship))
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to upsert relationship: {}", e)))?;
    }

    sqlx::query("DELETE FROM patient_identifiers WHERE person_id = $1")
        .bind(person.id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to clear identifier index: {}", e)))?;

    for identifier in &person.identifiers {
        sqlx::query(
            r#"
            INSERT INTO patient_identifiers (
                id, person_id, identifier_type_id, identifier, location_id, voided
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(identifier.id.as_uuid())
        .bind(person.id.as_uuid())
        .bind(identifier.identifier_type.id.as_uuid())
        .bind(&identifier.identifier)
        .bind(identifier.location.map(|l| *l.as_uuid()))
        .bind(identifier.is_voided())
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to index identifier: {}", e)))?;
    }

    Ok(())
}

/// Fails if another live patient holds a colliding identifier.
async fn check_unique(
    tx: &mut Transaction<'_, Postgres>,
    holder: PersonId,
    identifier: &PatientIdentifier,
) -> Result<(), DomainError> {
    let kind = &identifier.identifier_type;
    let rows = sqlx::query(
        r#"
        SELECT pi.person_id, pi.location_id
        FROM patient_identifiers pi
        JOIN persons p ON p.id = pi.person_id
        WHERE pi.identifier_type_id = $1
          AND pi.identifier = $2
          AND pi.person_id <> $3
          AND NOT pi.voided
          AND p.is_patient
          AND NOT p.voided
        "#,
    )
    .bind(kind.id.as_uuid())
    .bind(&identifier.identifier)
    .bind(holder.as_uuid())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| DomainError::database(format!("Failed to check identifier uniqueness: {}", e)))?;

    for row in rows {
        let other: Uuid = row
            .try_get("person_id")
            .map_err(|e| DomainError::database(format!("Failed to get person_id: {}", e)))?;
        let location: Option<Uuid> = row
            .try_get("location_id")
            .map_err(|e| DomainError::database(format!("Failed to get location_id: {}", e)))?;

        if kind.collides(identifier.location, location.map(LocationId::from_uuid)) {
            return Err(DomainError::new(
                ErrorCode::InvalidIdentifier,
                format!(
                    "Identifier '{}' of type '{}' is already in use by person {}",
                    identifier.identifier, kind.name, other
                ),
            )
            .with_detail("identifier", identifier.identifier.clone())
            .with_detail("person_id", holder.to_string()));
        }
    }
    Ok(())
}

async fn insert_audit(
    tx: &mut Transaction<'_, Postgres>,
    audit: &MergeAudit,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO person_merge_log (
            id, preferred_id, non_preferred_id, merged_data, created_by, date_created
        ) VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(audit.id().as_uuid())
    .bind(audit.preferred().as_uuid())
    .bind(audit.non_preferred().as_uuid())
    .bind(Json(audit))
    .bind(audit.created_by().as_str())
    .bind(audit.date_created().as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::database(format!("Failed to insert merge log: {}", e)))?;
    Ok(())
}

fn row_to_holding(row: sqlx::postgres::PgRow) -> Result<IdentifierHolding, DomainError> {
    let get_err = |field: &str, e: sqlx::Error| {
        DomainError::database(format!("Failed to get {}: {}", field, e))
    };

    let id: Uuid = row.try_get("id").map_err(|e| get_err("id", e))?;
    let holder: Uuid = row.try_get("person_id").map_err(|e| get_err("person_id", e))?;
    let holder_is_patient: bool = row.try_get("is_patient").map_err(|e| get_err("is_patient", e))?;
    let identifier: String = row.try_get("identifier").map_err(|e| get_err("identifier", e))?;
    let identifier_type: Uuid = row
        .try_get("identifier_type_id")
        .map_err(|e| get_err("identifier_type_id", e))?;
    let location: Option<Uuid> = row.try_get("location_id").map_err(|e| get_err("location_id", e))?;
    let voided: bool = row.try_get("voided").map_err(|e| get_err("voided", e))?;

    Ok(IdentifierHolding {
        holder: PersonId::from_uuid(holder),
        holder_is_patient,
        identifier_id: IdentifierId::from_uuid(id),
        identifier,
        identifier_type: IdentifierTypeId::from_uuid(identifier_type),
        location: location.map(LocationId::from_uuid),
        voided,
    })
}

fn row_to_identifier_type(row: sqlx::postgres::PgRow) -> Result<IdentifierType, DomainError> {
    let id: Uuid = row
        .try_get("id")
        .map_err(|e| DomainError::database(format!("Failed to get id: {}", e)))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| DomainError::database(format!("Failed to get name: {}", e)))?;
    let uniqueness: String = row
        .try_get("uniqueness")
        .map_err(|e| DomainError::database(format!("Failed to get uniqueness: {}", e)))?;

    Ok(IdentifierType {
        id: IdentifierTypeId::from_uuid(id),
        name,
        uniqueness: str_to_uniqueness(&uniqueness)?,
    })
}

fn uniqueness_to_str(uniqueness: UniquenessBehavior) -> &'static str {
    match uniqueness {
        UniquenessBehavior::None => "NONE",
        UniquenessBehavior::Location => "LOCATION",
        UniquenessBehavior::Unique => "UNIQUE",
    }
}

fn str_to_uniqueness(s: &str) -> Result<UniquenessBehavior, DomainError> {
    match s {
        "NONE" => Ok(UniquenessBehavior::None),
        "LOCATION" => Ok(UniquenessBehavior::Location),
        "UNIQUE" => Ok(UniquenessBehavior::Unique),
        _ => Err(DomainError::database(format!("Invalid uniqueness behavior: {}", s))),
    }
}
