//! Program enrollment migration.
//!
//! Enrollments are copied unless the preferred patient is already enrolled
//! in the same program on the same date.

use tracing::debug;

use crate::domain::clinical::ProgramEnrollment;
use crate::domain::foundation::{OperationContext, Voidable};
use crate::domain::merge::{EntityKind, MergeAuditBuilder, MergeError, MergeWorkingSet};

use super::{MigrationReport, Migrator};

pub struct ProgramEnrollmentMigrator;

impl Migrator for ProgramEnrollmentMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::ProgramEnrollment
    }

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError> {
        let pair = ws.pair;
        let mut report = MigrationReport::default();

        let candidates: Vec<ProgramEnrollment> = ws
            .enrollments
            .iter()
            .filter(|e| e.patient == pair.non_preferred && !e.is_voided())
            .cloned()
            .collect();

        for enrollment in candidates {
            let enrolled = ws.enrollments.iter().any(|e| {
                e.patient == pair.preferred && !e.is_voided() && e.same_enrollment(&enrollment)
            });
            if enrolled {
                report.skipped += 1;
                continue;
            }

            let copy = enrollment.copy_for(pair.preferred, &ctx.user, ctx.started_at());
            debug!(enrollment_id = %copy.id, program_id = %copy.program, "Copied program enrollment");
            audit.created_programs.push(copy.id);
            ws.enrollments.push(copy);
            report.migrated += 1;
        }

        Ok(report)
    }
}
