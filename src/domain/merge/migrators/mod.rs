//! Per-kind data migrators.
//!
//! Each migrator moves or copies one kind of record from the non-preferred
//! identity to the preferred one inside the working set. The registry runs
//! them in `EntityKind` order.

mod collections;
mod demographics;
mod identifiers;
mod observations;
mod programs;
mod relationships;
mod users;
mod visits;

pub use collections::{AddressMigrator, AttributeMigrator, NameMigrator};
pub use demographics::DemographicsMigrator;
pub use identifiers::IdentifierMigrator;
pub use observations::IndependentObsMigrator;
pub use programs::ProgramEnrollmentMigrator;
pub use relationships::RelationshipMigrator;
pub use users::UserAccountMigrator;
pub use visits::VisitMigrator;

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::foundation::OperationContext;

use super::{EntityKind, MergeAuditBuilder, MergeError, MergeWorkingSet};

/// Outcome of one migrator run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Records moved or copied onto the preferred identity.
    pub migrated: usize,
    /// Records left behind as duplicates.
    pub skipped: usize,
}

/// Migrates one kind of record from the non-preferred to the preferred identity.
///
/// Implementations only touch the working set; nothing is persisted until
/// the whole merge commits.
pub trait Migrator: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError>;
}

/// Migrators keyed, and therefore run, in `EntityKind` order.
pub struct MigratorRegistry {
    migrators: BTreeMap<EntityKind, Box<dyn Migrator>>,
}

impl MigratorRegistry {
    pub fn empty() -> Self {
        Self {
            migrators: BTreeMap::new(),
        }
    }

    /// Every migrator the merge engine ships with.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(DemographicsMigrator));
        registry.register(Box::new(NameMigrator));
        registry.register(Box::new(AddressMigrator));
        registry.register(Box::new(IdentifierMigrator));
        registry.register(Box::new(AttributeMigrator));
        registry.register(Box::new(RelationshipMigrator));
        registry.register(Box::new(VisitMigrator));
        registry.register(Box::new(IndependentObsMigrator));
        registry.register(Box::new(UserAccountMigrator));
        registry.register(Box::new(ProgramEnrollmentMigrator));
        registry
    }

    /// Registers a migrator, replacing any previous one of the same kind.
    pub fn register(&mut self, migrator: Box<dyn Migrator>) -> Option<Box<dyn Migrator>> {
        self.migrators.insert(migrator.kind(), migrator)
    }

    pub fn kinds(&self) -> Vec<EntityKind> {
        self.migrators.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Migrator> {
        self.migrators.values().map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.migrators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrators.is_empty()
    }
}

impl Default for MigratorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for MigratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigratorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
