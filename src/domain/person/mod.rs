//! Person module.
//!
//! The `PersonIdentity` aggregate with its owned names, addresses,
//! identifiers and attributes, plus the person-level records that reference
//! it: relationships and user accounts.

mod address;
mod attribute;
mod identifier;
mod identity;
mod name;
mod relationship;
mod user_account;

pub use address::PersonAddress;
pub use attribute::PersonAttribute;
pub use identifier::{IdentifierHolding, IdentifierType, PatientIdentifier, UniquenessBehavior};
pub use identity::{PersonIdentity, PreferredPromotions};
pub use name::PersonName;
pub use relationship::{Relationship, RelationshipType, Side};
pub use user_account::UserAccount;
