//! In-process adapters for storage and coordination.
//!
//! Backing for the binary when no database is configured, and the
//! adapters integration tests run against.

mod graph_store;
mod keyed_locker;

pub use graph_store::InMemoryIdentityGraphStore;
pub use keyed_locker::KeyedIdentityLocker;
