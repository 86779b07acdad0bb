//! The in-memory merge pipeline: preconditions, migrators, finalizer.
//!
//! The engine owns the working set for the duration of a run. On failure the
//! set is dropped with the error, so a failed run has nothing to undo.

use tracing::{debug, warn};

use crate::domain::foundation::{OperationContext, StateMachine};
use crate::domain::person::PreferredPromotions;

use super::finalizer::{FinalizeReport, MergeFinalizer};
use super::migrators::{MigrationReport, MigratorRegistry};
use super::preconditions::MergePreconditions;
use super::{EntityKind, MergeAuditBuilder, MergeError, MergePair, MergeStatus, MergeWorkingSet};

/// Tunables that shape what a merge writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    void_reason_template: String,
}

impl MergePolicy {
    pub const DEFAULT_VOID_REASON: &'static str = "Merged with patient #{preferred}";

    /// `{preferred}` and `{non_preferred}` in the template are replaced by the ids.
    pub fn new(void_reason_template: impl Into<String>) -> Self {
        Self {
            void_reason_template: void_reason_template.into(),
        }
    }

    pub fn void_reason(&self, pair: &MergePair) -> String {
        self.void_reason_template
            .replace("{preferred}", &pair.preferred.to_string())
            .replace("{non_preferred}", &pair.non_preferred.to_string())
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VOID_REASON)
    }
}

/// Result of a run that reached `Finalizing`.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub status: MergeStatus,
    pub audit: MergeAuditBuilder,
    pub reports: Vec<(EntityKind, MigrationReport)>,
    pub finalized: FinalizeReport,
    pub promotions: PreferredPromotions,
}

/// A run that stopped early, with the status it ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeFailure {
    pub status: MergeStatus,
    pub error: MergeError,
}

pub struct MergeEngine {
    registry: MigratorRegistry,
    policy: MergePolicy,
}

impl MergeEngine {
    pub fn new(registry: MigratorRegistry, policy: MergePolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Runs preconditions, every migrator in kind order, the finalizer and
    /// preferred-member promotion.
    pub fn run(
        &self,
        mut ws: MergeWorkingSet,
        ctx: &OperationContext,
    ) -> Result<(MergeWorkingSet, MergeOutcome), MergeFailure> {
        let mut status = MergeStatus::Validating;

        if let Err(error) = MergePreconditions::check(&ws, ctx.started_at()) {
            advance(&mut status, MergeStatus::Rejected);
            return Err(MergeFailure { status, error });
        }

        advance(&mut status, MergeStatus::Migrating);
        let mut audit = MergeAuditBuilder::new(ws.pair);
        let mut reports = Vec::with_capacity(self.registry.len());

        for migrator in self.registry.iter() {
            let kind = migrator.kind();
            match migrator.migrate(&mut ws, ctx, &mut audit) {
                Ok(report) => {
                    debug!(
                        %kind,
                        migrated = report.migrated,
                        skipped = report.skipped,
                        "Migrator finished"
                    );
                    reports.push((kind, report));
                }
                Err(error) => {
                    warn!(%kind, error = %error, "Migrator failed, rolling back merge");
                    advance(&mut status, MergeStatus::RolledBack);
                    return Err(MergeFailure { status, error });
                }
            }
        }

        advance(&mut status, MergeStatus::Finalizing);
        let reason = self.policy.void_reason(&ws.pair);
        let finalized = MergeFinalizer::finalize(&mut ws, ctx, &reason);
        let promotions = ws.preferred.ensure_preferred_members();

        Ok((
            ws,
            MergeOutcome {
                status,
                audit,
                reports,
                finalized,
                promotions,
            },
        ))
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(MigratorRegistry::standard(), MergePolicy::default())
    }
}

fn advance(status: &mut MergeStatus, to: MergeStatus) {
    debug_assert!(status.can_transition_to(&to), "{status:?} -> {to:?}");
    *status = to;
}
