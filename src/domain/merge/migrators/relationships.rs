//! Relationship migration.
//!
//! Relationships of the non-preferred identity are re-pointed by copy: the
//! original is voided and, unless an equivalent already exists, a copy with
//! the preferred identity in its place is created. Relationships between the
//! pair themselves would become self-referential and are only voided.

use tracing::debug;

use crate::domain::foundation::{OperationContext, RelationshipId, VoidInfo, Voidable};
use crate::domain::merge::{EntityKind, MergeAuditBuilder, MergeError, MergeWorkingSet};

use super::{MigrationReport, Migrator};

const SELF_REFERENTIAL_REASON: &str = "Both sides merged into one identity";
const REPOINTED_REASON: &str = "Re-pointed to preferred identity by merge";

pub struct RelationshipMigrator;

impl Migrator for RelationshipMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Relationship
    }

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError> {
        let pair = ws.pair;
        let mut report = MigrationReport::default();
        let void_as = |reason: &str| VoidInfo::new(ctx.user.clone(), reason, ctx.started_at());

        let candidates: Vec<RelationshipId> = ws
            .relationships
            .iter()
            .filter(|r| !r.is_voided() && r.involves(pair.non_preferred))
            .map(|r| r.id)
            .collect();

        for id in candidates {
            let Some(index) = ws.relationships.iter().position(|r| r.id == id) else {
                continue;
            };
            let original = ws.relationships[index].clone();
            let copy = original.repointed(
                pair.non_preferred,
                pair.preferred,
                &ctx.user,
                ctx.started_at(),
            );

            if copy.person_a == copy.person_b {
                ws.relationships[index].void(void_as(SELF_REFERENTIAL_REASON));
                audit.voided_relationships.push(id);
                debug!(relationship_id = %id, "Voided relationship between merged identities");
                report.skipped += 1;
                continue;
            }

            let exists = ws
                .relationships
                .iter()
                .any(|r| r.id != id && !r.is_voided() && r.is_equivalent(&copy));

            ws.relationships[index].void(void_as(REPOINTED_REASON));
            audit.voided_relationships.push(id);

            if exists {
                debug!(relationship_id = %id, "Voided duplicate relationship");
                report.skipped += 1;
                continue;
            }

            debug!(relationship_id = %id, copy_id = %copy.id, "Re-pointed relationship");
            audit.created_relationships.push(copy.id);
            ws.relationships.push(copy);
            report.migrated += 1;
        }

        Ok(report)
    }
}
