//! Patient identifiers and identifier types.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ActingUser, IdentifierId, IdentifierTypeId, LocationId, PersonId, Timestamp, ValidationError,
    VoidInfo,
};

/// How an identifier type constrains values across patients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UniquenessBehavior {
    /// No uniqueness enforced.
    None,
    /// Unique per type, value and location.
    Location,
    /// Globally unique per type and value.
    Unique,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierType {
    pub id: IdentifierTypeId,
    pub name: String,
    pub uniqueness: UniquenessBehavior,
}

impl IdentifierType {
    pub fn new(name: impl Into<String>, uniqueness: UniquenessBehavior) -> Self {
        Self {
            id: IdentifierTypeId::new(),
            name: name.into(),
            uniqueness,
        }
    }

    /// Whether two non-voided identifiers of this type, with the given
    /// locations and equal values, may not coexist on different patients.
    pub fn collides(&self, location: Option<LocationId>, other_location: Option<LocationId>) -> bool {
        match self.uniqueness {
            UniquenessBehavior::None => false,
            UniquenessBehavior::Unique => true,
            UniquenessBehavior::Location => location == other_location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIdentifier {
    pub id: IdentifierId,
    pub identifier: String,
    pub identifier_type: IdentifierType,
    pub location: Option<LocationId>,
    pub preferred: bool,
    pub creator: Option<ActingUser>,
    pub date_created: Timestamp,
    pub void: Option<VoidInfo>,
}

impl PatientIdentifier {
    pub fn new(identifier: impl Into<String>, identifier_type: IdentifierType) -> Self {
        Self {
            id: IdentifierId::new(),
            identifier: identifier.into(),
            identifier_type,
            location: None,
            preferred: false,
            creator: None,
            date_created: Timestamp::now(),
            void: None,
        }
    }

    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }

    pub fn at_location(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }

    /// Same value and same type.
    pub fn same_identity(&self, other: &PatientIdentifier) -> bool {
        self.identifier == other.identifier && self.identifier_type.id == other.identifier_type.id
    }

    /// Rejects blank identifier values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.identifier.trim().is_empty() {
            return Err(ValidationError::empty_field("identifier"));
        }
        Ok(())
    }

    pub fn copy_for_merge(&self, creator: &ActingUser, now: Timestamp) -> Self {
        Self {
            id: IdentifierId::new(),
            preferred: false,
            creator: Some(creator.clone()),
            date_created: now,
            void: None,
            ..self.clone()
        }
    }
}

crate::impl_voidable!(PatientIdentifier);

/// An identifier value held by some person, as reported by the store when
/// checking uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierHolding {
    pub holder: PersonId,
    pub holder_is_patient: bool,
    pub identifier_id: IdentifierId,
    pub identifier: String,
    pub identifier_type: IdentifierTypeId,
    pub location: Option<LocationId>,
    pub voided: bool,
}
