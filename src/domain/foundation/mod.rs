//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, errors, the acting-user/clock context
//! and event infrastructure shared by the person, clinical and merge modules.

mod acting;
mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;
mod voiding;

pub use acting::{ActingUser, Clock, FixedClock, OperationContext, SystemClock};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{
    AddressId, AttributeId, AttributeTypeId, ConceptId, EncounterId, EnrollmentId, IdentifierId,
    IdentifierTypeId, LocationId, MergeId, NameId, ObsId, OrderId, OrderTypeId, PersonId,
    ProgramId, RelationshipId, RelationshipTypeId, UserAccountId, VisitId, VisitTypeId,
};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
pub use voiding::{VoidInfo, Voidable};
