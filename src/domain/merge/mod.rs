//! Identity merge engine.
//!
//! Reconciles two duplicate identities into one: preconditions, per-kind
//! migrators (using the obs tree relocator), the finalizer and the audit
//! recorder. Everything here is synchronous and works on an in-memory
//! working set; loading, locking and committing live in the application
//! layer.

mod audit;
mod engine;
mod errors;
mod events;
mod finalizer;
mod graph;
mod kind;
pub mod migrators;
pub mod obs_relocator;
mod preconditions;
mod status;

pub use audit::{MergeAudit, MergeAuditBuilder, Prior, PriorDate};
pub use engine::{MergeEngine, MergeFailure, MergeOutcome, MergePolicy};
pub use errors::{MergeError, MergePair};
pub use events::IdentitiesMerged;
pub use finalizer::{FinalizeReport, MergeFinalizer};
pub use graph::{MergeChangeset, MergeWorkingSet, PersonGraph};
pub use kind::EntityKind;
pub use migrators::{MigrationReport, Migrator, MigratorRegistry};
pub use obs_relocator::{ObsRelocationError, ObsTreeRelocator, RelocationTarget};
pub use preconditions::MergePreconditions;
pub use status::MergeStatus;
