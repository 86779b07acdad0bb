//! Program enrollments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ActingUser, EnrollmentId, PersonId, ProgramId, Timestamp, VoidInfo};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEnrollment {
    pub id: EnrollmentId,
    pub patient: PersonId,
    pub program: ProgramId,
    pub date_enrolled: NaiveDate,
    pub date_completed: Option<NaiveDate>,
    pub creator: Option<ActingUser>,
    pub date_created: Timestamp,
    pub void: Option<VoidInfo>,
}

impl ProgramEnrollment {
    pub fn new(patient: PersonId, program: ProgramId, date_enrolled: NaiveDate) -> Self {
        Self {
            id: EnrollmentId::new(),
            patient,
            program,
            date_enrolled,
            date_completed: None,
            creator: None,
            date_created: Timestamp::now(),
            void: None,
        }
    }

    /// Same program, enrolled on the same day.
    pub fn same_enrollment(&self, other: &ProgramEnrollment) -> bool {
        self.program == other.program && self.date_enrolled == other.date_enrolled
    }

    pub fn copy_for(&self, patient: PersonId, creator: &ActingUser, now: Timestamp) -> Self {
        Self {
            id: EnrollmentId::new(),
            patient,
            creator: Some(creator.clone()),
            date_created: now,
            void: None,
            ..self.clone()
        }
    }
}

crate::impl_voidable!(ProgramEnrollment);
