//! MergeIdentitiesHandler - Command handler that merges two identities.
//!
//! Locks both identities, loads their graphs, runs the merge engine and
//! commits the changeset with its audit. Reindexing and event publishing
//! happen after the commit and never undo it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::foundation::{
    ActingUser, Clock, DomainError, ErrorCode, EventEnvelope, IdentifierTypeId, MergeId,
    OperationContext, PersonId, StateMachine,
};
use crate::domain::merge::{
    EntityKind, IdentitiesMerged, MergeAudit, MergeEngine, MergeError, MergePair,
    MergePreconditions, MergeStatus, MergeWorkingSet, PersonGraph,
};
use crate::domain::person::{IdentifierHolding, IdentifierType};
use crate::ports::{EventPublisher, IdentityGraphStore, IdentityLocker, SearchIndexer};

/// Command to merge `non_preferred_id` into `preferred_id`.
#[derive(Debug, Clone, Copy)]
pub struct MergeIdentitiesCommand {
    pub preferred_id: PersonId,
    pub non_preferred_id: PersonId,
}

/// Result of a committed merge.
#[derive(Debug, Clone)]
pub struct MergeIdentitiesResult {
    /// The surviving identity as committed.
    pub merged: PersonGraph,
    pub audit: MergeAudit,
    pub status: MergeStatus,
}

/// Post-commit side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSettings {
    pub reindex_on_merge: bool,
    pub publish_events: bool,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            reindex_on_merge: true,
            publish_events: true,
        }
    }
}

/// Handler for merging identities.
pub struct MergeIdentitiesHandler {
    store: Arc<dyn IdentityGraphStore>,
    locker: Arc<dyn IdentityLocker>,
    indexer: Arc<dyn SearchIndexer>,
    publisher: Arc<dyn EventPublisher>,
    engine: Arc<MergeEngine>,
    clock: Arc<dyn Clock>,
    settings: MergeSettings,
}

impl MergeIdentitiesHandler {
    pub fn new(
        store: Arc<dyn IdentityGraphStore>,
        locker: Arc<dyn IdentityLocker>,
        indexer: Arc<dyn SearchIndexer>,
        publisher: Arc<dyn EventPublisher>,
        engine: Arc<MergeEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            locker,
            indexer,
            publisher,
            engine,
            clock,
            settings: MergeSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: MergeSettings) -> Self {
        self.settings = settings;
        self
    }

    #[tracing::instrument(
        skip(self, cmd, user),
        fields(preferred = %cmd.preferred_id, non_preferred = %cmd.non_preferred_id, user = %user)
    )]
    pub async fn handle(
        &self,
        cmd: MergeIdentitiesCommand,
        user: ActingUser,
    ) -> Result<MergeIdentitiesResult, MergeError> {
        let pair = MergePair::new(cmd.preferred_id, cmd.non_preferred_id);
        if let Err(err) = MergePreconditions::check_pair(&pair) {
            warn!(error = %err, "Merge rejected");
            return Err(err);
        }

        // 1. Lock both identities, ascending
        let lease = self
            .locker
            .lock(&pair.lock_order())
            .await
            .map_err(|e| MergeError::from_domain(e, pair, EntityKind::Person))?;

        let ctx = OperationContext::new(user, Arc::clone(&self.clock));
        info!("Merge started");

        // 2. Load both graphs and the holders of the identifiers that may move
        let mut preferred = self.load(pair, pair.preferred).await?;
        let mut non_preferred = self.load(pair, pair.non_preferred).await?;
        self.refresh_identifier_types(pair, [&mut preferred, &mut non_preferred])
            .await?;
        let holdings = self.holdings(pair, &non_preferred).await?;
        let ws = MergeWorkingSet::assemble(preferred, non_preferred, holdings);

        // 3. Preconditions, migrators, finalizer
        let (ws, outcome) = self.engine.run(ws, &ctx).map_err(|failure| {
            if failure.status == MergeStatus::Rejected {
                warn!(error = %failure.error, "Merge rejected");
            }
            failure.error
        })?;

        // 4. Seal and commit as one unit
        let status = outcome
            .status
            .transition_to(MergeStatus::Sealed)
            .map_err(|e| MergeError::Infrastructure {
                pair,
                kind: EntityKind::Person,
                message: e.to_string(),
            })?;
        let audit = outcome
            .audit
            .seal(MergeId::new(), ctx.user.clone(), ctx.started_at());
        let changeset = ws.into_changeset(audit.clone());
        let mut merged = changeset.preferred.clone();

        if let Err(e) = self.store.commit(changeset).await {
            let kind = match e.code {
                ErrorCode::InvalidIdentifier | ErrorCode::ConfigurationLocked => {
                    EntityKind::Identifier
                }
                _ => EntityKind::Person,
            };
            let err = MergeError::from_domain(e, pair, kind);
            warn!(error = %err, status = ?MergeStatus::RolledBack, "Merge commit failed, rolling back");
            return Err(err);
        }
        drop(lease);
        merged.person.version += 1;

        info!(merge_id = %audit.id(), "Merge committed");

        // 5. Fire-and-forget notifications
        self.notify(&audit).await;

        Ok(MergeIdentitiesResult {
            merged,
            audit,
            status,
        })
    }

    async fn load(&self, pair: MergePair, id: PersonId) -> Result<PersonGraph, MergeError> {
        self.store
            .load_graph(&id)
            .await
            .map_err(|e| MergeError::from_domain(e, pair, EntityKind::Person))?
            .ok_or(MergeError::NotFound { pair, missing: id })
    }

    /// Replaces embedded identifier type metadata with the store's current
    /// configuration, so uniqueness decisions use the live rules.
    async fn refresh_identifier_types(
        &self,
        pair: MergePair,
        graphs: [&mut PersonGraph; 2],
    ) -> Result<(), MergeError> {
        let mut cache: HashMap<IdentifierTypeId, Option<IdentifierType>> = HashMap::new();
        for graph in graphs {
            for identifier in &mut graph.person.identifiers {
                let id = identifier.identifier_type.id;
                if !cache.contains_key(&id) {
                    let current = self
                        .store
                        .identifier_type(&id)
                        .await
                        .map_err(|e| MergeError::from_domain(e, pair, EntityKind::Identifier))?;
                    cache.insert(id, current);
                }
                if let Some(Some(current)) = cache.get(&id) {
                    identifier.identifier_type = current.clone();
                }
            }
        }
        Ok(())
    }

    async fn holdings(
        &self,
        pair: MergePair,
        non_preferred: &PersonGraph,
    ) -> Result<Vec<IdentifierHolding>, MergeError> {
        let mut seen = HashSet::new();
        let mut holdings = Vec::new();
        for identifier in non_preferred.person.active_identifiers() {
            let found = self
                .store
                .find_identifier_holders(&identifier.identifier_type.id, &identifier.identifier)
                .await
                .map_err(|e| MergeError::from_domain(e, pair, EntityKind::Identifier))?;
            holdings.extend(found.into_iter().filter(|h| seen.insert(h.identifier_id)));
        }
        Ok(holdings)
    }

    async fn notify(&self, audit: &MergeAudit) {
        if self.settings.reindex_on_merge {
            let ids = [audit.preferred(), audit.non_preferred()];
            let results = join_all(ids.iter().map(|id| self.indexer.reindex(id))).await;
            for (id, result) in ids.iter().zip(results) {
                if let Err(e) = result {
                    warn!(person_id = %id, error = %e, "Search reindex failed");
                }
            }
        }

        if self.settings.publish_events {
            if let Err(e) = self.publish(audit).await {
                warn!(merge_id = %audit.id(), error = %e, "Failed to publish merge event");
            }
        }
    }

    async fn publish(&self, audit: &MergeAudit) -> Result<(), DomainError> {
        let event = IdentitiesMerged::from_audit(audit);
        let envelope = EventEnvelope::from_event(&event)
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?
            .with_user_id(audit.created_by().as_str());
        self.publisher.publish(envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{FixedClock, Timestamp, Voidable};
    use crate::domain::merge::MergeChangeset;
    use crate::domain::person::{PatientIdentifier, PersonIdentity, UniquenessBehavior};
    use crate::ports::IdentityLease;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockStore {
        graphs: Mutex<HashMap<PersonId, PersonGraph>>,
        types: Mutex<HashMap<IdentifierTypeId, IdentifierType>>,
        committed: Mutex<Vec<MergeChangeset>>,
        commit_error: Mutex<Option<DomainError>>,
    }

    impl MockStore {
        fn with(graphs: Vec<PersonGraph>) -> Self {
            let store = Self::default();
            for graph in graphs {
                store.graphs.lock().unwrap().insert(graph.id(), graph);
            }
            store
        }

        fn failing_commit(self, err: DomainError) -> Self {
            *self.commit_error.lock().unwrap() = Some(err);
            self
        }

        fn commits(&self) -> usize {
            self.committed.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl IdentityGraphStore for MockStore {
        async fn load_graph(&self, id: &PersonId) -> Result<Option<PersonGraph>, DomainError> {
            Ok(self.graphs.lock().unwrap().get(id).cloned())
        }

        async fn find_identifier_holders(
            &self,
            _identifier_type: &IdentifierTypeId,
            _identifier: &str,
        ) -> Result<Vec<IdentifierHolding>, DomainError> {
            Ok(vec![])
        }

        async fn identifier_type(
            &self,
            id: &IdentifierTypeId,
        ) -> Result<Option<IdentifierType>, DomainError> {
            Ok(self.types.lock().unwrap().get(id).cloned())
        }

        async fn commit(&self, changeset: MergeChangeset) -> Result<(), DomainError> {
            if let Some(err) = self.commit_error.lock().unwrap().clone() {
                return Err(err);
            }
            self.committed.lock().unwrap().push(changeset);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockLocker {
        calls: Mutex<Vec<Vec<PersonId>>>,
        unavailable: bool,
    }

    #[async_trait]
    impl IdentityLocker for MockLocker {
        async fn lock(&self, ids: &[PersonId]) -> Result<IdentityLease, DomainError> {
            self.calls.lock().unwrap().push(ids.to_vec());
            if self.unavailable {
                return Err(DomainError::new(ErrorCode::LockUnavailable, "busy"));
            }
            Ok(IdentityLease::new(ids.to_vec(), Vec::new()))
        }
    }

    #[derive(Default)]
    struct MockIndexer {
        reindexed: Mutex<Vec<PersonId>>,
        failing: bool,
    }

    #[async_trait]
    impl SearchIndexer for MockIndexer {
        async fn reindex(&self, person: &PersonId) -> Result<(), DomainError> {
            if self.failing {
                return Err(DomainError::new(ErrorCode::InternalError, "index down"));
            }
            self.reindexed.lock().unwrap().push(*person);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockPublisher {
        published: Mutex<Vec<EventEnvelope>>,
    }

    #[async_trait]
    impl EventPublisher for MockPublisher {
        async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
            self.published.lock().unwrap().push(event);
            Ok(())
        }

        async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
            for event in events {
                self.publish(event).await?;
            }
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<MockStore>,
        locker: Arc<MockLocker>,
        indexer: Arc<MockIndexer>,
        publisher: Arc<MockPublisher>,
    }

    impl Fixture {
        fn new(store: MockStore) -> Self {
            Self {
                store: Arc::new(store),
                locker: Arc::new(MockLocker::default()),
                indexer: Arc::new(MockIndexer::default()),
                publisher: Arc::new(MockPublisher::default()),
            }
        }

        fn handler(&self) -> MergeIdentitiesHandler {
            MergeIdentitiesHandler::new(
                self.store.clone(),
                self.locker.clone(),
                self.indexer.clone(),
                self.publisher.clone(),
                Arc::new(MergeEngine::default()),
                Arc::new(FixedClock::at(Timestamp::from_unix_secs(1_700_000_000))),
            )
        }
    }

    fn admin() -> ActingUser {
        ActingUser::new("admin").unwrap()
    }

    fn patient() -> PersonGraph {
        PersonGraph::new(PersonIdentity::new_patient(PersonId::new()))
    }

    fn command(preferred: &PersonGraph, non_preferred: &PersonGraph) -> MergeIdentitiesCommand {
        MergeIdentitiesCommand {
            preferred_id: preferred.id(),
            non_preferred_id: non_preferred.id(),
        }
    }

    #[tokio::test]
    async fn self_merge_is_rejected_before_locking() {
        let p = patient();
        let fx = Fixture::new(MockStore::with(vec![p.clone()]));

        let err = fx.handler().handle(command(&p, &p), admin()).await.unwrap_err();

        assert_eq!(err, MergeError::IdentityEquality(p.id()));
        assert!(fx.locker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_identity_is_not_found() {
        let p = patient();
        let missing = patient();
        let fx = Fixture::new(MockStore::with(vec![p.clone()]));

        let err = fx.handler().handle(command(&p, &missing), admin()).await.unwrap_err();

        assert!(matches!(err, MergeError::NotFound { missing: m, .. } if m == missing.id()));
        assert_eq!(fx.store.commits(), 0);
    }

    #[tokio::test]
    async fn successful_merge_commits_once_and_notifies() {
        let mrn = IdentifierType::new("MRN", UniquenessBehavior::Unique);
        let p = patient();
        let mut np = patient();
        np.person.identifiers.push(PatientIdentifier::new("42", mrn));
        let fx = Fixture::new(MockStore::with(vec![p.clone(), np.clone()]));

        let result = fx.handler().handle(command(&p, &np), admin()).await.unwrap();

        assert_eq!(result.status, MergeStatus::Sealed);
        assert_eq!(result.audit.preferred(), p.id());
        assert_eq!(result.audit.created_identifiers().len(), 1);
        assert_eq!(result.merged.person.active_identifiers().count(), 1);
        assert_eq!(fx.store.commits(), 1);
        let committed = fx.store.committed.lock().unwrap();
        assert!(committed[0].non_preferred.person.is_voided());
        assert_eq!(committed[0].audit, result.audit);

        let expected_order = MergePair::new(p.id(), np.id()).lock_order().to_vec();
        assert_eq!(*fx.locker.calls.lock().unwrap(), vec![expected_order]);
        assert_eq!(*fx.indexer.reindexed.lock().unwrap(), vec![p.id(), np.id()]);
        let published = fx.publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type, "identities.merged.v1");
    }

    #[tokio::test]
    async fn commit_failure_maps_to_taxonomy_and_skips_notifications() {
        let p = patient();
        let np = patient();
        let store = MockStore::with(vec![p.clone(), np.clone()]).failing_commit(
            DomainError::new(ErrorCode::InvalidIdentifier, "already in use")
                .with_detail("identifier", "42"),
        );
        let fx = Fixture::new(store);

        let err = fx.handler().handle(command(&p, &np), admin()).await.unwrap_err();

        assert!(matches!(err, MergeError::InvalidIdentifier { ref value, .. } if value == "42"));
        assert!(fx.indexer.reindexed.lock().unwrap().is_empty());
        assert!(fx.publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reindex_failure_does_not_fail_merge() {
        let p = patient();
        let np = patient();
        let mut fx = Fixture::new(MockStore::with(vec![p.clone(), np.clone()]));
        fx.indexer = Arc::new(MockIndexer {
            failing: true,
            ..MockIndexer::default()
        });

        let result = fx.handler().handle(command(&p, &np), admin()).await;

        assert!(result.is_ok());
        assert_eq!(fx.store.commits(), 1);
    }

    #[tokio::test]
    async fn lock_timeout_is_infrastructure_error() {
        let p = patient();
        let np = patient();
        let mut fx = Fixture::new(MockStore::with(vec![p.clone(), np.clone()]));
        fx.locker = Arc::new(MockLocker {
            unavailable: true,
            ..MockLocker::default()
        });

        let err = fx.handler().handle(command(&p, &np), admin()).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(fx.store.commits(), 0);
    }

    #[tokio::test]
    async fn disabled_side_effects_are_skipped() {
        let p = patient();
        let np = patient();
        let fx = Fixture::new(MockStore::with(vec![p.clone(), np.clone()]));
        let handler = fx.handler().with_settings(MergeSettings {
            reindex_on_merge: false,
            publish_events: false,
        });

        handler.handle(command(&p, &np), admin()).await.unwrap();

        assert!(fx.indexer.reindexed.lock().unwrap().is_empty());
        assert!(fx.publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stored_identifier_type_overrides_embedded_metadata() {
        let stale = IdentifierType::new("MRN", UniquenessBehavior::None);
        let mut current = stale.clone();
        current.uniqueness = UniquenessBehavior::Unique;
        let p = patient();
        let mut np = patient();
        np.person.identifiers.push(PatientIdentifier::new("42", stale));
        let store = MockStore::with(vec![p.clone(), np.clone()]);
        store.types.lock().unwrap().insert(current.id, current.clone());
        let fx = Fixture::new(store);

        let result = fx.handler().handle(command(&p, &np), admin()).await.unwrap();

        let copied = result.merged.person.active_identifiers().next().unwrap();
        assert_eq!(copied.identifier_type, current);
    }
}
