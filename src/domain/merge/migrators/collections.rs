//! Names, addresses and attributes: copied onto the preferred identity
//! unless an equivalent non-voided record is already there.

use tracing::debug;

use crate::domain::foundation::{OperationContext, Voidable};
use crate::domain::merge::{EntityKind, MergeAuditBuilder, MergeError, MergeWorkingSet};

use super::{MigrationReport, Migrator};

/// Copies every non-voided `source` item that has no equivalent among the
/// non-voided `target` items. Returns the copies in source order.
fn copy_missing<T: Voidable + Clone>(
    source: &[T],
    target: &mut Vec<T>,
    equivalent: impl Fn(&T, &T) -> bool,
    copy: impl Fn(&T) -> T,
    report: &mut MigrationReport,
) -> Vec<T> {
    let mut created = Vec::new();
    for item in source.iter().filter(|i| !i.is_voided()) {
        if target.iter().any(|t| !t.is_voided() && equivalent(t, item)) {
            report.skipped += 1;
            continue;
        }
        let copied = copy(item);
        target.push(copied.clone());
        created.push(copied);
        report.migrated += 1;
    }
    created
}

pub struct NameMigrator;

impl Migrator for NameMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Name
    }

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError> {
        let mut report = MigrationReport::default();
        let created = copy_missing(
            &ws.non_preferred.names,
            &mut ws.preferred.names,
            |a, b| a.full_name() == b.full_name(),
            |n| n.copy_for_merge(&ctx.user, ctx.started_at()),
            &mut report,
        );
        for name in created {
            debug!(name_id = %name.id, full_name = %name.full_name(), "Copied name");
            audit.created_names.push(name.id);
        }
        Ok(report)
    }
}

pub struct AddressMigrator;

impl Migrator for AddressMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Address
    }

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError> {
        let mut report = MigrationReport::default();
        let created = copy_missing(
            &ws.non_preferred.addresses,
            &mut ws.preferred.addresses,
            |a, b| a.same_content(b),
            |a| a.copy_for_merge(&ctx.user, ctx.started_at()),
            &mut report,
        );
        for address in created {
            debug!(address_id = %address.id, "Copied address");
            audit.created_addresses.push(address.id);
        }
        Ok(report)
    }
}

pub struct AttributeMigrator;

impl Migrator for AttributeMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Attribute
    }

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError> {
        let mut report = MigrationReport::default();
        let created = copy_missing(
            &ws.non_preferred.attributes,
            &mut ws.preferred.attributes,
            |a, b| a.same_content(b),
            |a| a.copy_for_merge(&ctx.user, ctx.started_at()),
            &mut report,
        );
        for attribute in created {
            debug!(attribute_id = %attribute.id, "Copied attribute");
            audit.created_attributes.push(attribute.id);
        }
        Ok(report)
    }
}
