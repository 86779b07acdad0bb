//! Identity graph store port.
//!
//! Loads a person with every record that references it, answers
//! identifier-uniqueness lookups, and commits a merge changeset.
//!
//! # Design
//!
//! - **Whole-graph reads**: a merge loads both graphs once and works in memory
//! - **Single write**: `commit` is the only mutation and is all-or-nothing
//! - **Write-time uniqueness**: the store re-checks identifier uniqueness
//!   inside the commit, so a merge racing an unrelated edit cannot slip a
//!   duplicate through

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, IdentifierTypeId, PersonId};
use crate::domain::merge::{MergeChangeset, PersonGraph};
use crate::domain::person::{IdentifierHolding, IdentifierType};

#[async_trait]
pub trait IdentityGraphStore: Send + Sync {
    /// Loads a person with names, addresses, identifiers, attributes,
    /// relationships, visits, encounters, obs trees, orders, enrollments
    /// and user accounts, voided and retired records included.
    ///
    /// Returns `None` if the person does not exist.
    async fn load_graph(&self, id: &PersonId) -> Result<Option<PersonGraph>, DomainError>;

    /// Every person holding `identifier` under the given type, voided
    /// holdings included.
    async fn find_identifier_holders(
        &self,
        identifier_type: &IdentifierTypeId,
        identifier: &str,
    ) -> Result<Vec<IdentifierHolding>, DomainError>;

    /// Identifier type metadata.
    async fn identifier_type(
        &self,
        id: &IdentifierTypeId,
    ) -> Result<Option<IdentifierType>, DomainError>;

    /// Writes both graphs of a merge and its audit as one unit.
    ///
    /// Each person's `version` must still match the store; on success both
    /// versions advance by one.
    ///
    /// # Errors
    ///
    /// - `ConcurrentModification` if either person was written after it was
    ///   loaded; nothing is written
    /// - `InvalidIdentifier` if a live identifier would break its type's
    ///   uniqueness rule; nothing is written
    /// - `ConfigurationLocked` if metadata the changeset touches is locked
    /// - `DatabaseError` on persistence failure; nothing is written
    async fn commit(&self, changeset: MergeChangeset) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_graph_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn IdentityGraphStore) {}
    }
}
