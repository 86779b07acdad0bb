//! Clinical module.
//!
//! Records that reference a patient without being owned by the person
//! aggregate: visits, encounters, obs trees, orders and program enrollments.

mod obs;
mod order;
mod program;
mod visit;

pub use obs::{Obs, ObsArena, ObsValue};
pub use order::{Order, OrderType};
pub use program::ProgramEnrollment;
pub use visit::{Encounter, Visit};
