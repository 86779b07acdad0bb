//! Merge audit: the builder migrators append to, and the sealed record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ActingUser, AddressId, AttributeId, ConceptId, EncounterId, EnrollmentId, IdentifierId,
    MergeId, NameId, ObsId, OrderId, PersonId, RelationshipId, Timestamp, UserAccountId, VisitId,
};

use super::MergePair;

/// Snapshot of a scalar value that was about to be overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prior<T> {
    pub value: Option<T>,
}

impl<T> Prior<T> {
    pub fn of(value: Option<T>) -> Self {
        Self { value }
    }
}

/// Snapshot of a date together with its estimated flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorDate {
    pub date: Option<NaiveDate>,
    pub estimated: bool,
}

/// Mutable audit accumulated during a merge run.
///
/// Lists are appended in migrator order, then discovery order within a
/// migrator, so two runs over the same data produce the same audit.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeAuditBuilder {
    pair: MergePair,
    pub created_names: Vec<NameId>,
    pub created_addresses: Vec<AddressId>,
    pub created_identifiers: Vec<IdentifierId>,
    pub created_attributes: Vec<AttributeId>,
    pub created_relationships: Vec<RelationshipId>,
    pub created_programs: Vec<EnrollmentId>,
    pub voided_relationships: Vec<RelationshipId>,
    pub moved_visits: Vec<VisitId>,
    pub moved_encounters: Vec<EncounterId>,
    /// Orders placed outside any encounter.
    pub moved_orders: Vec<OrderId>,
    pub moved_independent_observations: Vec<ObsId>,
    pub moved_users: Vec<UserAccountId>,
    pub prior_gender: Option<Prior<String>>,
    pub prior_date_of_birth: Option<PriorDate>,
    pub prior_date_of_death: Option<PriorDate>,
    pub prior_cause_of_death: Option<Prior<ConceptId>>,
}

impl MergeAuditBuilder {
    pub fn new(pair: MergePair) -> Self {
        Self {
            pair,
            created_names: Vec::new(),
            created_addresses: Vec::new(),
            created_identifiers: Vec::new(),
            created_attributes: Vec::new(),
            created_relationships: Vec::new(),
            created_programs: Vec::new(),
            voided_relationships: Vec::new(),
            moved_visits: Vec::new(),
            moved_encounters: Vec::new(),
            moved_orders: Vec::new(),
            moved_independent_observations: Vec::new(),
            moved_users: Vec::new(),
            prior_gender: None,
            prior_date_of_birth: None,
            prior_date_of_death: None,
            prior_cause_of_death: None,
        }
    }

    pub fn pair(&self) -> MergePair {
        self.pair
    }

    /// Records a prior gender once; later overwrites keep the first snapshot.
    pub fn snapshot_gender(&mut self, value: Option<String>) {
        self.prior_gender.get_or_insert(Prior::of(value));
    }

    pub fn snapshot_date_of_birth(&mut self, date: Option<NaiveDate>, estimated: bool) {
        self.prior_date_of_birth
            .get_or_insert(PriorDate { date, estimated });
    }

    pub fn snapshot_date_of_death(&mut self, date: Option<NaiveDate>, estimated: bool) {
        self.prior_date_of_death
            .get_or_insert(PriorDate { date, estimated });
    }

    pub fn snapshot_cause_of_death(&mut self, value: Option<ConceptId>) {
        self.prior_cause_of_death.get_or_insert(Prior::of(value));
    }

    /// Freezes the audit under a fresh id.
    pub fn seal(self, id: MergeId, created_by: ActingUser, date_created: Timestamp) -> MergeAudit {
        MergeAudit {
            id,
            preferred: self.pair.preferred,
            non_preferred: self.pair.non_preferred,
            created_by,
            date_created,
            created_names: self.created_names,
            created_addresses: self.created_addresses,
            created_identifiers: self.created_identifiers,
            created_attributes: self.created_attributes,
            created_relationships: self.created_relationships,
            created_programs: self.created_programs,
            voided_relationships: self.voided_relationships,
            moved_visits: self.moved_visits,
            moved_encounters: self.moved_encounters,
            moved_orders: self.moved_orders,
            moved_independent_observations: self.moved_independent_observations,
            moved_users: self.moved_users,
            prior_gender: self.prior_gender,
            prior_date_of_birth: self.prior_date_of_birth,
            prior_date_of_death: self.prior_date_of_death,
            prior_cause_of_death: self.prior_cause_of_death,
        }
    }
}

/// Immutable record of one merge. Persisted as a single JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeAudit {
    id: MergeId,
    preferred: PersonId,
    non_preferred: PersonId,
    created_by: ActingUser,
    date_created: Timestamp,
    created_names: Vec<NameId>,
    created_addresses: Vec<AddressId>,
    created_identifiers: Vec<IdentifierId>,
    created_attributes: Vec<AttributeId>,
    created_relationships: Vec<RelationshipId>,
    created_programs: Vec<EnrollmentId>,
    voided_relationships: Vec<RelationshipId>,
    moved_visits: Vec<VisitId>,
    moved_encounters: Vec<EncounterId>,
    #[serde(default)]
    moved_orders: Vec<OrderId>,
    moved_independent_observations: Vec<ObsId>,
    moved_users: Vec<UserAccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prior_gender: Option<Prior<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prior_date_of_birth: Option<PriorDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prior_date_of_death: Option<PriorDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prior_cause_of_death: Option<Prior<ConceptId>>,
}

impl MergeAudit {
    pub fn id(&self) -> MergeId {
        self.id
    }

    pub fn preferred(&self) -> PersonId {
        self.preferred
    }

    pub fn non_preferred(&self) -> PersonId {
        self.non_preferred
    }

    pub fn involves(&self, person: PersonId) -> bool {
        self.preferred == person || self.non_preferred == person
    }

    pub fn created_by(&self) -> &ActingUser {
        &self.created_by
    }

    pub fn date_created(&self) -> Timestamp {
        self.date_created
    }

    pub fn created_names(&self) -> &[NameId] {
        &self.created_names
    }

    pub fn created_addresses(&self) -> &[AddressId] {
        &self.created_addresses
    }

    pub fn created_identifiers(&self) -> &[IdentifierId] {
        &self.created_identifiers
    }

    pub fn created_attributes(&self) -> &[AttributeId] {
        &self.created_attributes
    }

    pub fn created_relationships(&self) -> &[RelationshipId] {
        &self.created_relationships
    }

    pub fn created_programs(&self) -> &[EnrollmentId] {
        &self.created_programs
    }

    pub fn voided_relationships(&self) -> &[RelationshipId] {
        &self.voided_relationships
    }

    pub fn moved_visits(&self) -> &[VisitId] {
        &self.moved_visits
    }

    pub fn moved_encounters(&self) -> &[EncounterId] {
        &self.moved_encounters
    }

    pub fn moved_orders(&self) -> &[OrderId] {
        &self.moved_orders
    }

    pub fn moved_independent_observations(&self) -> &[ObsId] {
        &self.moved_independent_observations
    }

    pub fn moved_users(&self) -> &[UserAccountId] {
        &self.moved_users
    }

    pub fn prior_gender(&self) -> Option<&Prior<String>> {
        self.prior_gender.as_ref()
    }

    pub fn prior_date_of_birth(&self) -> Option<&PriorDate> {
        self.prior_date_of_birth.as_ref()
    }

    pub fn prior_date_of_death(&self) -> Option<&PriorDate> {
        self.prior_date_of_death.as_ref()
    }

    pub fn prior_cause_of_death(&self) -> Option<&Prior<ConceptId>> {
        self.prior_cause_of_death.as_ref()
    }
}
