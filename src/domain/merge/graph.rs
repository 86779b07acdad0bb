//! Person graphs and the merge working set.
//!
//! A `PersonGraph` is everything the store holds for one person. For a merge
//! both graphs are loaded once into a `MergeWorkingSet`; migrators mutate the
//! working set in memory and a successful run turns it into a single
//! `MergeChangeset` that the store writes atomically. Dropping the working
//! set is the rollback.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::clinical::{Encounter, ObsArena, Order, ProgramEnrollment, Visit};
use crate::domain::foundation::{PersonId, Voidable};
use crate::domain::person::{IdentifierHolding, PatientIdentifier, PersonIdentity, Relationship, UserAccount};

use super::{MergeAudit, MergePair};

/// One person together with every record that references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonGraph {
    pub person: PersonIdentity,
    /// Relationships where the person is on either side.
    pub relationships: Vec<Relationship>,
    pub visits: Vec<Visit>,
    pub encounters: Vec<Encounter>,
    pub observations: ObsArena,
    pub orders: Vec<Order>,
    pub enrollments: Vec<ProgramEnrollment>,
    pub users: Vec<UserAccount>,
}

impl PersonGraph {
    pub fn new(person: PersonIdentity) -> Self {
        Self {
            person,
            relationships: Vec::new(),
            visits: Vec::new(),
            encounters: Vec::new(),
            observations: ObsArena::new(),
            orders: Vec::new(),
            enrollments: Vec::new(),
            users: Vec::new(),
        }
    }

    pub fn id(&self) -> PersonId {
        self.person.id
    }
}

/// Both graphs of a merge, flattened so records can change owner freely.
#[derive(Debug, Clone)]
pub struct MergeWorkingSet {
    pub pair: MergePair,
    pub preferred: PersonIdentity,
    pub non_preferred: PersonIdentity,
    pub relationships: Vec<Relationship>,
    pub visits: Vec<Visit>,
    pub encounters: Vec<Encounter>,
    pub observations: ObsArena,
    pub orders: Vec<Order>,
    pub enrollments: Vec<ProgramEnrollment>,
    pub users: Vec<UserAccount>,
    /// Holders of the non-preferred identity's identifier values, as
    /// reported by the store before migration.
    pub identifier_holdings: Vec<IdentifierHolding>,
}

impl MergeWorkingSet {
    pub fn assemble(
        preferred: PersonGraph,
        non_preferred: PersonGraph,
        identifier_holdings: Vec<IdentifierHolding>,
    ) -> Self {
        let pair = MergePair::new(preferred.id(), non_preferred.id());

        let mut seen = HashSet::new();
        let relationships = preferred
            .relationships
            .into_iter()
            .chain(non_preferred.relationships)
            .filter(|r| seen.insert(r.id))
            .collect();

        let mut observations = preferred.observations;
        observations.absorb(non_preferred.observations);

        Self {
            pair,
            preferred: preferred.person,
            non_preferred: non_preferred.person,
            relationships,
            visits: concat(preferred.visits, non_preferred.visits),
            encounters: concat(preferred.encounters, non_preferred.encounters),
            observations,
            orders: concat(preferred.orders, non_preferred.orders),
            enrollments: concat(preferred.enrollments, non_preferred.enrollments),
            users: concat(preferred.users, non_preferred.users),
            identifier_holdings,
        }
    }

    /// The current graph of one side of the pair.
    pub fn graph_of(&self, person: PersonId) -> Option<PersonGraph> {
        if person == self.pair.preferred {
            Some(self.extract(&self.preferred))
        } else if person == self.pair.non_preferred {
            Some(self.extract(&self.non_preferred))
        } else {
            None
        }
    }

    pub fn into_changeset(self, audit: MergeAudit) -> MergeChangeset {
        MergeChangeset {
            preferred: self.extract(&self.preferred),
            non_preferred: self.extract(&self.non_preferred),
            audit,
        }
    }

    fn extract(&self, identity: &PersonIdentity) -> PersonGraph {
        let person = identity.id;
        let mut observations = ObsArena::new();
        for obs in self.observations.iter().filter(|o| o.person == person) {
            observations.insert(obs.clone());
        }

        PersonGraph {
            person: identity.clone(),
            relationships: owned(&self.relationships, |r| r.involves(person)),
            visits: owned(&self.visits, |v| v.patient == person),
            encounters: owned(&self.encounters, |e| e.patient == person),
            observations,
            orders: owned(&self.orders, |o| o.patient == person),
            enrollments: owned(&self.enrollments, |e| e.patient == person),
            users: owned(&self.users, |u| u.person == person),
        }
    }
}

/// Everything a sealed merge writes, committed as one unit together with
/// its audit.
///
/// Records are written back by id; merges never delete. Relationships
/// between the pair appear in both graphs.
#[derive(Debug, Clone)]
pub struct MergeChangeset {
    pub preferred: PersonGraph,
    pub non_preferred: PersonGraph,
    pub audit: MergeAudit,
}

impl MergeChangeset {
    pub fn graphs(&self) -> [&PersonGraph; 2] {
        [&self.preferred, &self.non_preferred]
    }

    /// Non-voided identifiers on non-voided patients, with their holder.
    ///
    /// These are the values the store re-checks for uniqueness on write.
    pub fn live_identifiers(&self) -> impl Iterator<Item = (PersonId, &PatientIdentifier)> {
        self.graphs()
            .into_iter()
            .map(|g| &g.person)
            .filter(|p| p.is_patient && !p.is_voided())
            .flat_map(|p| p.active_identifiers().map(move |i| (p.id, i)))
    }
}

fn concat<T>(mut left: Vec<T>, right: Vec<T>) -> Vec<T> {
    left.extend(right);
    left
}

fn owned<T: Clone>(items: &[T], keep: impl Fn(&T) -> bool) -> Vec<T> {
    items.iter().filter(|i| keep(i)).cloned().collect()
}
