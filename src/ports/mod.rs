//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `IdentityGraphStore` - Person graphs, identifier lookups, merge commits
//! - `MergeAuditRepository` - Sealed merge audits (read side)
//!
//! ## Coordination Ports
//!
//! - `IdentityLocker` - Ordered exclusive locks on identities
//!
//! ## Notification Ports
//!
//! - `SearchIndexer` - Post-merge search reindexing
//! - `EventPublisher` - Domain event publishing

mod event_publisher;
mod identity_graph_store;
mod identity_locker;
mod merge_audit_repository;
mod search_indexer;

pub use event_publisher::EventPublisher;
pub use identity_graph_store::IdentityGraphStore;
pub use identity_locker::{IdentityLease, IdentityLocker};
pub use merge_audit_repository::MergeAuditRepository;
pub use search_indexer::SearchIndexer;
