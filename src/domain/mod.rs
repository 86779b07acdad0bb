//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, voiding)
//! - `person` - Person identity aggregate, relationships and user accounts
//! - `clinical` - Visits, encounters, obs trees, orders, program enrollments
//! - `merge` - Identity merge engine (preconditions, migrators, audit)

pub mod clinical;
pub mod foundation;
pub mod merge;
pub mod person;
