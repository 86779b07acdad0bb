//! PersonIdentity aggregate.
//!
//! A person (optionally promoted to a patient) with the collections it owns
//! outright: names, addresses, identifiers and attributes. Records that merely
//! reference the person (visits, obs, relationships, ...) live outside the
//! aggregate and are loaded alongside it as a `PersonGraph`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ActingUser, ConceptId, PersonId, Timestamp, VoidInfo, Voidable,
};

use super::{PatientIdentifier, PersonAddress, PersonAttribute, PersonName};

/// Person aggregate.
///
/// # Invariants
///
/// - At most one non-voided member of each of `names`, `addresses`,
///   `identifiers` and `attributes` is preferred.
/// - Voiding the person cascades to every owned collection member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonIdentity {
    pub id: PersonId,
    pub is_patient: bool,
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub birthdate_estimated: bool,
    pub dead: bool,
    pub deathdate: Option<NaiveDate>,
    pub deathdate_estimated: bool,
    pub cause_of_death: Option<ConceptId>,
    pub names: Vec<PersonName>,
    pub addresses: Vec<PersonAddress>,
    pub identifiers: Vec<PatientIdentifier>,
    pub attributes: Vec<PersonAttribute>,
    pub date_created: Timestamp,
    pub changed_by: Option<ActingUser>,
    pub date_changed: Option<Timestamp>,
    pub void: Option<VoidInfo>,
    /// Store write counter as of loading. Commits made from a copy whose
    /// version no longer matches the store are rejected.
    #[serde(default)]
    pub version: u64,
}

/// Which collections had a member promoted to preferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreferredPromotions {
    pub name: bool,
    pub address: bool,
    pub identifier: bool,
}

impl PersonIdentity {
    /// Creates a bare patient with no demographics.
    pub fn new_patient(id: PersonId) -> Self {
        Self {
            id,
            is_patient: true,
            gender: None,
            birthdate: None,
            birthdate_estimated: false,
            dead: false,
            deathdate: None,
            deathdate_estimated: false,
            cause_of_death: None,
            names: Vec::new(),
            addresses: Vec::new(),
            identifiers: Vec::new(),
            attributes: Vec::new(),
            date_created: Timestamp::now(),
            changed_by: None,
            date_changed: None,
            void: None,
            version: 0,
        }
    }

    /// Creates a person that has not been promoted to a patient.
    pub fn new_person(id: PersonId) -> Self {
        Self {
            is_patient: false,
            ..Self::new_patient(id)
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_birthdate(mut self, birthdate: NaiveDate, estimated: bool) -> Self {
        self.birthdate = Some(birthdate);
        self.birthdate_estimated = estimated;
        self
    }

    pub fn with_name(mut self, name: PersonName) -> Self {
        self.names.push(name);
        self
    }

    pub fn with_address(mut self, address: PersonAddress) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn with_identifier(mut self, identifier: PatientIdentifier) -> Self {
        self.identifiers.push(identifier);
        self
    }

    pub fn with_attribute(mut self, attribute: PersonAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn active_names(&self) -> impl Iterator<Item = &PersonName> {
        self.names.iter().filter(|n| !n.is_voided())
    }

    pub fn active_addresses(&self) -> impl Iterator<Item = &PersonAddress> {
        self.addresses.iter().filter(|a| !a.is_voided())
    }

    pub fn active_identifiers(&self) -> impl Iterator<Item = &PatientIdentifier> {
        self.identifiers.iter().filter(|i| !i.is_voided())
    }

    pub fn active_attributes(&self) -> impl Iterator<Item = &PersonAttribute> {
        self.attributes.iter().filter(|a| !a.is_voided())
    }

    pub fn preferred_name(&self) -> Option<&PersonName> {
        self.active_names().find(|n| n.preferred)
    }

    pub fn preferred_address(&self) -> Option<&PersonAddress> {
        self.active_addresses().find(|a| a.preferred)
    }

    pub fn preferred_identifier(&self) -> Option<&PatientIdentifier> {
        self.active_identifiers().find(|i| i.preferred)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Records who changed the person and when.
    pub fn touch(&mut self, by: &ActingUser, at: Timestamp) {
        self.changed_by = Some(by.clone());
        self.date_changed = Some(at);
    }

    /// Promotes the first non-voided name, address and identifier to
    /// preferred wherever a collection has no preferred non-voided member.
    pub fn ensure_preferred_members(&mut self) -> PreferredPromotions {
        PreferredPromotions {
            name: promote_first(&mut self.names, |n| n.preferred, |n| n.preferred = true),
            address: promote_first(&mut self.addresses, |a| a.preferred, |a| a.preferred = true),
            identifier: promote_first(
                &mut self.identifiers,
                |i| i.preferred,
                |i| i.preferred = true,
            ),
        }
    }

    /// Voids every non-voided name, address, identifier and attribute.
    ///
    /// Returns the number of records voided.
    pub fn void_owned_collections(&mut self, info: &VoidInfo) -> usize {
        let mut voided = 0;
        voided += void_all(&mut self.names, info);
        voided += void_all(&mut self.addresses, info);
        voided += void_all(&mut self.identifiers, info);
        voided += void_all(&mut self.attributes, info);
        voided
    }
}

crate::impl_voidable!(PersonIdentity);

fn promote_first<T: Voidable>(
    items: &mut [T],
    is_preferred: impl Fn(&T) -> bool,
    mark: impl Fn(&mut T),
) -> bool {
    if items.iter().any(|i| !i.is_voided() && is_preferred(i)) {
        return false;
    }
    match items.iter_mut().find(|i| !i.is_voided()) {
        Some(first) => {
            mark(first);
            true
        }
        None => false,
    }
}

fn void_all<T: Voidable>(items: &mut [T], info: &VoidInfo) -> usize {
    items
        .iter_mut()
        .filter(|i| !i.is_voided())
        .map(|i| i.void(info.clone()))
        .filter(|changed| *changed)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::person::{IdentifierType, UniquenessBehavior};

    fn void_info() -> VoidInfo {
        VoidInfo::new(ActingUser::new("admin").unwrap(), "test", Timestamp::from_unix_secs(0))
    }

    #[test]
    fn promotes_first_active_name_when_none_preferred() {
        let mut voided = PersonName::new("Old", "Name");
        voided.void(void_info());
        let mut person = PersonIdentity::new_patient(PersonId::new())
            .with_name(voided)
            .with_name(PersonName::new("Ann", "Lee"))
            .with_name(PersonName::new("Anne", "Lee"));

        let promoted = person.ensure_preferred_members();

        assert!(promoted.name);
        assert_eq!(person.preferred_name().unwrap().full_name(), "Ann Lee");
        assert!(!person.names[0].preferred);
    }

    #[test]
    fn keeps_existing_preferred_member() {
        let mut person = PersonIdentity::new_patient(PersonId::new())
            .with_name(PersonName::new("Ann", "Lee"))
            .with_name(PersonName::new("Anne", "Lee").preferred());

        let promoted = person.ensure_preferred_members();

        assert!(!promoted.name);
        assert_eq!(person.preferred_name().unwrap().full_name(), "Anne Lee");
    }

    #[test]
    fn voided_preferred_member_does_not_count() {
        let mut stale = PersonAddress::new("1 Old Rd", "Town").preferred();
        stale.void(void_info());
        let mut person = PersonIdentity::new_patient(PersonId::new())
            .with_address(stale)
            .with_address(PersonAddress::new("2 New Rd", "Town"));

        let promoted = person.ensure_preferred_members();

        assert!(promoted.address);
        assert_eq!(person.preferred_address().unwrap().address1.as_deref(), Some("2 New Rd"));
    }

    #[test]
    fn void_owned_collections_counts_only_newly_voided() {
        let kind = IdentifierType::new("MRN", UniquenessBehavior::Unique);
        let mut already = PersonName::new("Gone", "Name");
        already.void(void_info());
        let mut person = PersonIdentity::new_patient(PersonId::new())
            .with_name(already)
            .with_name(PersonName::new("Ann", "Lee"))
            .with_identifier(PatientIdentifier::new("1", kind));

        assert_eq!(person.void_owned_collections(&void_info()), 2);
        assert!(person.names.iter().all(|n| n.is_voided()));
    }
}
