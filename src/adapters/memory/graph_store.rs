//! In-memory identity graph store.
//!
//! Keeps one document per person (relationships stored separately, since
//! they belong to two persons) plus the merge log. Used by the binary when no
//! database is configured and by integration tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::foundation::{
    DomainError, ErrorCode, IdentifierTypeId, MergeId, PersonId, Voidable,
};
use crate::domain::merge::{MergeAudit, MergeChangeset, PersonGraph};
use crate::domain::person::{IdentifierHolding, IdentifierType, Relationship};
use crate::ports::{IdentityGraphStore, MergeAuditRepository};

#[derive(Debug, Default)]
struct StoreState {
    persons: HashMap<PersonId, PersonGraph>,
    relationships: Vec<Relationship>,
    identifier_types: HashMap<IdentifierTypeId, IdentifierType>,
    locked_types: HashSet<IdentifierTypeId>,
    merge_log: Vec<MergeAudit>,
    fail_next_commit: bool,
}

impl StoreState {
    fn upsert_relationship(&mut self, relationship: Relationship) {
        match self.relationships.iter_mut().find(|r| r.id == relationship.id) {
            Some(existing) => *existing = relationship,
            None => self.relationships.push(relationship),
        }
    }

    fn stored_version(&self, id: PersonId) -> u64 {
        self.persons.get(&id).map_or(0, |g| g.person.version)
    }

    /// Rejects a changeset built from a graph that was written after it
    /// was loaded.
    fn check_versions(&self, changeset: &MergeChangeset) -> Result<(), DomainError> {
        for graph in changeset.graphs() {
            let current = self.stored_version(graph.id());
            if current != graph.person.version {
                return Err(DomainError::new(
                    ErrorCode::ConcurrentModification,
                    format!(
                        "Person {} was modified concurrently (loaded version {}, stored version {})",
                        graph.id(),
                        graph.person.version,
                        current
                    ),
                )
                .with_detail("person_id", graph.id().to_string()));
            }
        }
        Ok(())
    }

    fn put_graph(&mut self, mut graph: PersonGraph) {
        for relationship in std::mem::take(&mut graph.relationships) {
            self.upsert_relationship(relationship);
        }
        for identifier in &graph.person.identifiers {
            self.identifier_types
                .entry(identifier.identifier_type.id)
                .or_insert_with(|| identifier.identifier_type.clone());
        }
        self.persons.insert(graph.id(), graph);
    }

    /// Rejects identifiers whose embedded type metadata differs from a
    /// locked registered type.
    fn check_type_metadata(&self, changeset: &MergeChangeset) -> Result<(), DomainError> {
        for graph in changeset.graphs() {
            for identifier in &graph.person.identifiers {
                let embedded = &identifier.identifier_type;
                let Some(registered) = self.identifier_types.get(&embedded.id) else {
                    continue;
                };
                if registered != embedded && self.locked_types.contains(&embedded.id) {
                    return Err(DomainError::new(
                        ErrorCode::ConfigurationLocked,
                        format!("Identifier type '{}' is locked", registered.name),
                    )
                    .with_detail("identifier_type", embedded.id.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Re-checks every live identifier of the changeset against all other
    /// live patients as they would look after the commit.
    fn check_uniqueness(&self, changeset: &MergeChangeset) -> Result<(), DomainError> {
        let pair = [changeset.preferred.id(), changeset.non_preferred.id()];
        let others = self
            .persons
            .values()
            .filter(|g| !pair.contains(&g.id()))
            .chain(changeset.graphs());

        let live: Vec<_> = others
            .map(|g| &g.person)
            .filter(|p| p.is_patient && !p.is_voided())
            .flat_map(|p| p.active_identifiers().map(move |i| (p.id, i)))
            .collect();

        for (holder, identifier) in changeset.live_identifiers() {
            let kind = self
                .identifier_types
                .get(&identifier.identifier_type.id)
                .unwrap_or(&identifier.identifier_type);
            let clash = live.iter().find(|(other, existing)| {
                *other != holder
                    && existing.same_identity(identifier)
                    && kind.collides(identifier.location, existing.location)
            });
            if let Some((other, _)) = clash {
                return Err(DomainError::new(
                    ErrorCode::InvalidIdentifier,
                    format!(
                        "Identifier '{}' of type '{}' is already in use by person {}",
                        identifier.identifier, kind.name, other
                    ),
                )
                .with_detail("identifier", identifier.identifier.clone())
                .with_detail("person_id", holder.to_string()));
            }
        }
        Ok(())
    }
}

/// In-memory `IdentityGraphStore` and `MergeAuditRepository`.
///
/// Commits take the single write lock for the whole check-then-write, so a
/// commit is atomic with respect to every other call.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityGraphStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryIdentityGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores (or replaces) a person graph, registering the identifier types
    /// it uses. Replacing an existing person bumps its version.
    pub async fn insert_graph(&self, mut graph: PersonGraph) {
        let mut state = self.state.write().await;
        if state.persons.contains_key(&graph.id()) {
            graph.person.version = state.stored_version(graph.id()) + 1;
        }
        state.put_graph(graph);
    }

    pub async fn register_identifier_type(&self, identifier_type: IdentifierType) {
        self.state
            .write()
            .await
            .identifier_types
            .insert(identifier_type.id, identifier_type);
    }

    /// Marks an identifier type as administratively locked.
    pub async fn lock_identifier_type(&self, id: IdentifierTypeId) {
        self.state.write().await.locked_types.insert(id);
    }

    /// Makes the next commit fail with a database error, writing nothing.
    pub async fn fail_next_commit(&self) {
        self.state.write().await.fail_next_commit = true;
    }

    pub async fn person_count(&self) -> usize {
        self.state.read().await.persons.len()
    }

    pub async fn merge_count(&self) -> usize {
        self.state.read().await.merge_log.len()
    }
}

#[async_trait]
impl IdentityGraphStore for InMemoryIdentityGraphStore {
    async fn load_graph(&self, id: &PersonId) -> Result<Option<PersonGraph>, DomainError> {
        let state = self.state.read().await;
        let Some(stored) = state.persons.get(id) else {
            return Ok(None);
        };

        let mut graph = stored.clone();
        graph.relationships = state
            .relationships
            .iter()
            .filter(|r| r.involves(*id))
            .cloned()
            .collect();
        Ok(Some(graph))
    }

    async fn find_identifier_holders(
        &self,
        identifier_type: &IdentifierTypeId,
        identifier: &str,
    ) -> Result<Vec<IdentifierHolding>, DomainError> {
        let state = self.state.read().await;
        let holdings = state
            .persons
            .values()
            .flat_map(|g| {
                g.person
                    .identifiers
                    .iter()
                    .filter(|i| i.identifier_type.id == *identifier_type && i.identifier == identifier)
                    .map(|i| IdentifierHolding {
                        holder: g.person.id,
                        holder_is_patient: g.person.is_patient,
                        identifier_id: i.id,
                        identifier: i.identifier.clone(),
                        identifier_type: i.identifier_type.id,
                        location: i.location,
                        voided: i.is_voided(),
                    })
            })
            .collect();
        Ok(holdings)
    }

    async fn identifier_type(
        &self,
        id: &IdentifierTypeId,
    ) -> Result<Option<IdentifierType>, DomainError> {
        Ok(self.state.read().await.identifier_types.get(id).cloned())
    }

    async fn commit(&self, changeset: MergeChangeset) -> Result<(), DomainError> {
        let mut state = self.state.write().await;

        if std::mem::take(&mut state.fail_next_commit) {
            return Err(DomainError::database("Simulated commit failure"));
        }
        state.check_versions(&changeset)?;
        state.check_type_metadata(&changeset)?;
        state.check_uniqueness(&changeset)?;

        let MergeChangeset {
            mut preferred,
            mut non_preferred,
            audit,
        } = changeset;
        preferred.person.version += 1;
        non_preferred.person.version += 1;
        for graph in [&preferred, &non_preferred] {
            for identifier in &graph.person.identifiers {
                let kind = &identifier.identifier_type;
                state.identifier_types.insert(kind.id, kind.clone());
            }
        }
        debug!(merge_id = %audit.id(), "Committing merge changeset");
        state.put_graph(preferred);
        state.put_graph(non_preferred);
        state.merge_log.push(audit);
        Ok(())
    }
}

#[async_trait]
impl MergeAuditRepository for InMemoryIdentityGraphStore {
    async fn find_by_id(&self, id: &MergeId) -> Result<Option<MergeAudit>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .merge_log
            .iter()
            .find(|a| a.id() == *id)
            .cloned())
    }

    async fn find_by_person(&self, person: &PersonId) -> Result<Vec<MergeAudit>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .merge_log
            .iter()
            .filter(|a| a.involves(*person))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ActingUser, Timestamp};
    use crate::domain::merge::{MergeAuditBuilder, MergePair};
    use crate::domain::person::{
        PatientIdentifier, PersonIdentity, RelationshipType, UniquenessBehavior,
    };

    fn graph() -> PersonGraph {
        PersonGraph::new(PersonIdentity::new_patient(PersonId::new()))
    }

    fn changeset(preferred: PersonGraph, non_preferred: PersonGraph) -> MergeChangeset {
        let audit = MergeAuditBuilder::new(MergePair::new(preferred.id(), non_preferred.id()))
            .seal(
                MergeId::new(),
                ActingUser::new("admin").unwrap(),
                Timestamp::from_unix_secs(1_700_000_000),
            );
        MergeChangeset {
            preferred,
            non_preferred,
            audit,
        }
    }

    #[tokio::test]
    async fn load_graph_joins_relationships_from_both_sides() {
        let store = InMemoryIdentityGraphStore::new();
        let mut a = graph();
        let b = graph();
        a.relationships
            .push(Relationship::new(a.id(), b.id(), RelationshipType::new("Parent", "Child")));
        let (a_id, b_id) = (a.id(), b.id());
        store.insert_graph(a).await;
        store.insert_graph(b).await;

        let loaded = store.load_graph(&b_id).await.unwrap().unwrap();

        assert_eq!(loaded.relationships.len(), 1);
        assert!(loaded.relationships[0].links(a_id, b_id));
        assert!(store.load_graph(&PersonId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_identifier_holders_matches_type_and_value() {
        let store = InMemoryIdentityGraphStore::new();
        let mrn = IdentifierType::new("MRN", UniquenessBehavior::Unique);
        let mut a = graph();
        a.person.identifiers.push(PatientIdentifier::new("7", mrn.clone()));
        a.person.identifiers.push(PatientIdentifier::new("8", mrn.clone()));
        let holder = a.id();
        store.insert_graph(a).await;

        let holdings = store.find_identifier_holders(&mrn.id, "7").await.unwrap();

        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].holder, holder);
        assert!(store.identifier_type(&mrn.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn commit_rejects_duplicate_unique_identifier() {
        let store = InMemoryIdentityGraphStore::new();
        let mrn = IdentifierType::new("MRN", UniquenessBehavior::Unique);
        let mut other = graph();
        other.person.identifiers.push(PatientIdentifier::new("7", mrn.clone()));
        store.insert_graph(other).await;

        let mut preferred = graph();
        preferred.person.identifiers.push(PatientIdentifier::new("7", mrn));
        let err = store.commit(changeset(preferred, graph())).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidIdentifier);
        assert_eq!(err.detail("identifier"), Some("7"));
        assert_eq!(store.merge_count().await, 0);
        assert_eq!(store.person_count().await, 1);
    }

    #[tokio::test]
    async fn commit_rejects_changed_metadata_of_locked_type() {
        let store = InMemoryIdentityGraphStore::new();
        let mrn = IdentifierType::new("MRN", UniquenessBehavior::Unique);
        store.register_identifier_type(mrn.clone()).await;
        store.lock_identifier_type(mrn.id).await;

        let mut relaxed = mrn.clone();
        relaxed.uniqueness = UniquenessBehavior::None;
        let mut preferred = graph();
        preferred.person.identifiers.push(PatientIdentifier::new("7", relaxed));
        let err = store.commit(changeset(preferred, graph())).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ConfigurationLocked);
    }

    #[tokio::test]
    async fn failed_commit_writes_nothing_and_clears_flag() {
        let store = InMemoryIdentityGraphStore::new();
        store.fail_next_commit().await;

        assert!(store.commit(changeset(graph(), graph())).await.is_err());
        assert_eq!(store.person_count().await, 0);

        store.commit(changeset(graph(), graph())).await.unwrap();
        assert_eq!(store.person_count().await, 2);
    }

    #[tokio::test]
    async fn replacing_a_graph_bumps_its_version() {
        let store = InMemoryIdentityGraphStore::new();
        let person = graph();
        let id = person.id();
        store.insert_graph(person.clone()).await;
        assert_eq!(store.load_graph(&id).await.unwrap().unwrap().person.version, 0);

        store.insert_graph(person).await;

        assert_eq!(store.load_graph(&id).await.unwrap().unwrap().person.version, 1);
    }

    #[tokio::test]
    async fn commit_rejects_graph_edited_after_load() {
        let store = InMemoryIdentityGraphStore::new();
        let (preferred, non_preferred) = (graph(), graph());
        store.insert_graph(preferred.clone()).await;
        store.insert_graph(non_preferred.clone()).await;
        let loaded = store.load_graph(&preferred.id()).await.unwrap().unwrap();

        let mut edited = preferred.clone();
        edited.person.gender = Some("F".to_string());
        store.insert_graph(edited).await;
        let err = store
            .commit(changeset(loaded, non_preferred))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ConcurrentModification);
        assert_eq!(err.detail("person_id"), Some(preferred.id().to_string().as_str()));
        let stored = store.load_graph(&preferred.id()).await.unwrap().unwrap();
        assert_eq!(stored.person.gender.as_deref(), Some("F"));
        assert_eq!(store.merge_count().await, 0);
    }

    #[tokio::test]
    async fn commit_advances_both_versions() {
        let store = InMemoryIdentityGraphStore::new();
        let (preferred, non_preferred) = (graph(), graph());
        let (p_id, np_id) = (preferred.id(), non_preferred.id());
        store.insert_graph(preferred.clone()).await;
        store.insert_graph(non_preferred.clone()).await;

        store.commit(changeset(preferred.clone(), non_preferred.clone())).await.unwrap();

        assert_eq!(store.load_graph(&p_id).await.unwrap().unwrap().person.version, 1);
        assert_eq!(store.load_graph(&np_id).await.unwrap().unwrap().person.version, 1);
        let err = store.commit(changeset(preferred, non_preferred)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConcurrentModification);
    }

    #[tokio::test]
    async fn committed_audit_is_retrievable_by_id_and_person() {
        let store = InMemoryIdentityGraphStore::new();
        let cs = changeset(graph(), graph());
        let (id, preferred) = (cs.audit.id(), cs.preferred.id());
        store.commit(cs).await.unwrap();

        assert!(store.find_by_id(&id).await.unwrap().is_some());
        assert_eq!(store.find_by_person(&preferred).await.unwrap().len(), 1);
        assert!(store.find_by_person(&PersonId::new()).await.unwrap().is_empty());
    }
}
