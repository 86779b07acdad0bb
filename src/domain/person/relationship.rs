//! Relationships between two persons.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ActingUser, PersonId, RelationshipId, RelationshipTypeId, Timestamp, VoidInfo,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipType {
    pub id: RelationshipTypeId,
    /// What A is to B, e.g. "Parent".
    pub a_is_to_b: String,
    /// What B is to A, e.g. "Child".
    pub b_is_to_a: String,
}

impl RelationshipType {
    pub fn new(a_is_to_b: impl Into<String>, b_is_to_a: impl Into<String>) -> Self {
        Self {
            id: RelationshipTypeId::new(),
            a_is_to_b: a_is_to_b.into(),
            b_is_to_a: b_is_to_a.into(),
        }
    }

    /// A symmetric type reads the same from both sides (Sibling/Sibling),
    /// so swapping A and B does not produce a different relationship.
    pub fn is_symmetric(&self) -> bool {
        self.a_is_to_b == self.b_is_to_a
    }
}

/// Which side of a relationship a person occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub person_a: PersonId,
    pub person_b: PersonId,
    pub relationship_type: RelationshipType,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub creator: Option<ActingUser>,
    pub date_created: Timestamp,
    pub void: Option<VoidInfo>,
}

impl Relationship {
    pub fn new(person_a: PersonId, person_b: PersonId, relationship_type: RelationshipType) -> Self {
        Self {
            id: RelationshipId::new(),
            person_a,
            person_b,
            relationship_type,
            start_date: None,
            end_date: None,
            creator: None,
            date_created: Timestamp::now(),
            void: None,
        }
    }

    pub fn involves(&self, person: PersonId) -> bool {
        self.person_a == person || self.person_b == person
    }

    /// Whether the relationship links exactly the two given persons, in either order.
    pub fn links(&self, x: PersonId, y: PersonId) -> bool {
        (self.person_a == x && self.person_b == y) || (self.person_a == y && self.person_b == x)
    }

    pub fn side_of(&self, person: PersonId) -> Option<Side> {
        if self.person_a == person {
            Some(Side::A)
        } else if self.person_b == person {
            Some(Side::B)
        } else {
            None
        }
    }

    /// Same type and the same persons, order ignored when the type is symmetric.
    pub fn is_equivalent(&self, other: &Relationship) -> bool {
        if self.relationship_type.id != other.relationship_type.id {
            return false;
        }
        let same_order = self.person_a == other.person_a && self.person_b == other.person_b;
        if self.relationship_type.is_symmetric() {
            same_order || (self.person_a == other.person_b && self.person_b == other.person_a)
        } else {
            same_order
        }
    }

    /// Copy with every occurrence of `from` replaced by `to`.
    pub fn repointed(&self, from: PersonId, to: PersonId, creator: &ActingUser, now: Timestamp) -> Self {
        let swap = |p: PersonId| if p == from { to } else { p };
        Self {
            id: RelationshipId::new(),
            person_a: swap(self.person_a),
            person_b: swap(self.person_b),
            creator: Some(creator.clone()),
            date_created: now,
            void: None,
            ..self.clone()
        }
    }
}

crate::impl_voidable!(Relationship);
