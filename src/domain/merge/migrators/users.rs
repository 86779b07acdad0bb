//! User account migration: non-retired accounts follow the person.

use tracing::debug;

use crate::domain::foundation::OperationContext;
use crate::domain::merge::{EntityKind, MergeAuditBuilder, MergeError, MergeWorkingSet};

use super::{MigrationReport, Migrator};

pub struct UserAccountMigrator;

impl Migrator for UserAccountMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::UserAccount
    }

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        _ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError> {
        let pair = ws.pair;
        let mut report = MigrationReport::default();

        for user in ws
            .users
            .iter_mut()
            .filter(|u| u.person == pair.non_preferred && !u.is_retired())
        {
            user.person = pair.preferred;
            audit.moved_users.push(user.id);
            debug!(user_id = %user.id, username = %user.username, "Moved user account");
            report.migrated += 1;
        }

        Ok(report)
    }
}
