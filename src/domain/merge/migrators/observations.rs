//! Independent observation migration.
//!
//! Non-voided obs trees recorded outside any encounter move to the preferred
//! identity whole. Encounter obs move with their encounter.

use tracing::debug;

use crate::domain::foundation::{OperationContext, Voidable};
use crate::domain::merge::obs_relocator::{ObsTreeRelocator, RelocationTarget};
use crate::domain::merge::{EntityKind, MergeAuditBuilder, MergeError, MergeWorkingSet};

use super::{MigrationReport, Migrator};

pub struct IndependentObsMigrator;

impl Migrator for IndependentObsMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::IndependentObservation
    }

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        _ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError> {
        let pair = ws.pair;
        let mut report = MigrationReport::default();

        let roots: Vec<_> = ws
            .observations
            .roots()
            .filter(|o| o.person == pair.non_preferred && o.encounter.is_none() && !o.is_voided())
            .map(|o| o.id)
            .collect();

        for root in roots {
            let moved = ObsTreeRelocator::relocate(
                &mut ws.observations,
                root,
                RelocationTarget::person(pair.preferred),
            )
            .map_err(|e| MergeError::Infrastructure {
                pair,
                kind: EntityKind::IndependentObservation,
                message: e.to_string(),
            })?;
            debug!(obs_id = %root, nodes = moved.len(), "Moved independent obs tree");
            report.migrated += moved.len();
            audit.moved_independent_observations.extend(moved);
        }

        Ok(report)
    }
}
