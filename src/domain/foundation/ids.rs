//! Strongly-typed identifier value objects.
//!
//! Every record that can be relocated, copied or voided by a merge is keyed by
//! a UUID so that the audit trail only ever references identifiers that exist
//! in the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
///
/// Generates `new`, `from_uuid`, `as_uuid`, `Default`, `Display` and
/// `FromStr`, matching the hand-written identifiers elsewhere in the crate.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Identifier of a person (and, when promoted, the patient that extends it).
    PersonId
);
uuid_id!(
    /// Identifier of a person name.
    NameId
);
uuid_id!(
    /// Identifier of a person address.
    AddressId
);
uuid_id!(
    /// Identifier of a patient identifier record.
    IdentifierId
);
uuid_id!(
    /// Identifier of a person attribute.
    AttributeId
);
uuid_id!(
    /// Identifier of a relationship between two persons.
    RelationshipId
);
uuid_id!(
    /// Identifier of a visit.
    VisitId
);
uuid_id!(
    /// Identifier of an encounter.
    EncounterId
);
uuid_id!(
    /// Identifier of a single observation node.
    ObsId
);
uuid_id!(
    /// Identifier of a clinical order.
    OrderId
);
uuid_id!(
    /// Identifier of a program enrollment.
    EnrollmentId
);
uuid_id!(
    /// Identifier of a user account.
    UserAccountId
);
uuid_id!(
    /// Identifier of a sealed merge audit record.
    MergeId
);
uuid_id!(IdentifierTypeId);
uuid_id!(AttributeTypeId);
uuid_id!(RelationshipTypeId);
uuid_id!(OrderTypeId);
uuid_id!(ProgramId);
uuid_id!(ConceptId);
uuid_id!(LocationId);
uuid_id!(VisitTypeId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_id_generates_unique_values() {
        let a = PersonId::new();
        let b = PersonId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn person_id_parses_from_string() {
        let uuid = Uuid::new_v4();
        let parsed: PersonId = uuid.to_string().parse().unwrap();
        assert_eq!(parsed.as_uuid(), &uuid);
    }

    #[test]
    fn person_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<PersonId>().is_err());
    }

    #[test]
    fn ids_order_by_uuid() {
        let low = PersonId::from_uuid(Uuid::from_u128(1));
        let high = PersonId::from_uuid(Uuid::from_u128(2));
        assert!(low < high);
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ObsId::from_uuid(Uuid::from_u128(42));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", Uuid::from_u128(42)));
    }
}
