//! Identifier migration.
//!
//! An identifier is copied unless the preferred identity already holds the
//! same value and type, or a third patient holds it under a uniqueness rule
//! the copy would break. Blank values abort the merge.

use tracing::debug;

use crate::domain::foundation::OperationContext;
use crate::domain::merge::{EntityKind, MergeAuditBuilder, MergeError, MergeWorkingSet};
use crate::domain::person::{IdentifierHolding, PatientIdentifier};

use super::{MigrationReport, Migrator};

pub struct IdentifierMigrator;

impl IdentifierMigrator {
    /// A live identifier on a patient outside the pair that the copy would
    /// collide with.
    fn conflicting_holder<'a>(
        ws: &'a MergeWorkingSet,
        identifier: &PatientIdentifier,
    ) -> Option<&'a IdentifierHolding> {
        let pair = ws.pair;
        ws.identifier_holdings.iter().find(|h| {
            h.holder != pair.preferred
                && h.holder != pair.non_preferred
                && h.holder_is_patient
                && !h.voided
                && h.identifier_type == identifier.identifier_type.id
                && h.identifier == identifier.identifier
                && identifier
                    .identifier_type
                    .collides(identifier.location, h.location)
        })
    }
}

impl Migrator for IdentifierMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Identifier
    }

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError> {
        let mut report = MigrationReport::default();
        let candidates: Vec<PatientIdentifier> =
            ws.non_preferred.active_identifiers().cloned().collect();

        for identifier in candidates {
            identifier
                .validate()
                .map_err(|e| MergeError::InvalidIdentifier {
                    pair: ws.pair,
                    kind: EntityKind::Identifier,
                    value: identifier.identifier.clone(),
                    reason: e.to_string(),
                })?;

            if ws
                .preferred
                .active_identifiers()
                .any(|i| i.same_identity(&identifier))
            {
                debug!(identifier = %identifier.identifier, "Identifier already on preferred identity");
                report.skipped += 1;
                continue;
            }

            if let Some(holding) = Self::conflicting_holder(ws, &identifier) {
                debug!(
                    identifier = %identifier.identifier,
                    holder = %holding.holder,
                    "Identifier rejected: held by another patient"
                );
                report.skipped += 1;
                continue;
            }

            let copy = identifier.copy_for_merge(&ctx.user, ctx.started_at());
            debug!(identifier_id = %copy.id, identifier = %copy.identifier, "Copied identifier");
            audit.created_identifiers.push(copy.id);
            ws.preferred.identifiers.push(copy);
            report.migrated += 1;
        }

        Ok(report)
    }
}
