//! Entity kinds touched by a merge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of records a merge migrates.
///
/// The declaration order is the order migrators run in and therefore the
/// order audit lists are filled; do not reorder variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Scalar demographics on the person itself.
    Person,
    Name,
    Address,
    Identifier,
    Attribute,
    Relationship,
    /// Visits together with every encounter (and encounter obs/orders).
    Visit,
    IndependentObservation,
    UserAccount,
    ProgramEnrollment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Name => "name",
            EntityKind::Address => "address",
            EntityKind::Identifier => "identifier",
            EntityKind::Attribute => "attribute",
            EntityKind::Relationship => "relationship",
            EntityKind::Visit => "visit",
            EntityKind::IndependentObservation => "independent_observation",
            EntityKind::UserAccount => "user_account",
            EntityKind::ProgramEnrollment => "program_enrollment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
