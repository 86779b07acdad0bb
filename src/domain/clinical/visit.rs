//! Visits and encounters.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    EncounterId, LocationId, ObsId, OrderId, PersonId, Timestamp, VisitId, VisitTypeId, VoidInfo,
};

/// A period of care at a location; groups encounters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub patient: PersonId,
    pub visit_type: VisitTypeId,
    pub location: Option<LocationId>,
    pub start_datetime: Timestamp,
    pub stop_datetime: Option<Timestamp>,
    pub encounters: Vec<EncounterId>,
    pub void: Option<VoidInfo>,
}

impl Visit {
    pub fn new(patient: PersonId, visit_type: VisitTypeId, start_datetime: Timestamp) -> Self {
        Self {
            id: VisitId::new(),
            patient,
            visit_type,
            location: None,
            start_datetime,
            stop_datetime: None,
            encounters: Vec::new(),
            void: None,
        }
    }
}

crate::impl_voidable!(Visit);

/// A single clinical interaction; owns top-level obs and orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub patient: PersonId,
    pub visit: Option<VisitId>,
    pub location: Option<LocationId>,
    pub encounter_datetime: Timestamp,
    /// Top-level obs only; group members hang off their parents.
    pub obs: Vec<ObsId>,
    pub orders: Vec<OrderId>,
    pub void: Option<VoidInfo>,
}

impl Encounter {
    pub fn new(patient: PersonId, encounter_datetime: Timestamp) -> Self {
        Self {
            id: EncounterId::new(),
            patient,
            visit: None,
            location: None,
            encounter_datetime,
            obs: Vec::new(),
            orders: Vec::new(),
            void: None,
        }
    }
}

crate::impl_voidable!(Encounter);
