//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-process graph store and identity locker
//! - `postgres` - PostgreSQL graph store and merge audit log
//! - `search` - Search reindex notifications
//! - `events` - Event bus implementations
//! - `http` - REST endpoints

pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod search;

pub use events::{InMemoryEventBus, LoggingEventPublisher};
pub use memory::{InMemoryIdentityGraphStore, KeyedIdentityLocker};
pub use postgres::{PostgresIdentityGraphStore, PostgresMergeAuditRepository};
pub use search::{LoggingSearchIndexer, RecordingSearchIndexer};
