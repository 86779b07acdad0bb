//! PostgreSQL adapters - Database implementations for persistence ports.
//!
//! - `PostgresIdentityGraphStore` - Person documents, identifier index, merge commits
//! - `PostgresMergeAuditRepository` - Read side of the merge log
//!
//! Schema lives in `migrations/` and is applied with `MIGRATOR`.

mod identity_graph_store;
mod merge_audit_repository;

pub use identity_graph_store::PostgresIdentityGraphStore;
pub use merge_audit_repository::PostgresMergeAuditRepository;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
