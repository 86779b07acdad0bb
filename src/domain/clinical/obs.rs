//! Observations and the arena that holds obs trees.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::{
    ConceptId, EncounterId, LocationId, ObsId, OrderId, PersonId, Timestamp, VoidInfo, Voidable,
};

/// The recorded value of an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ObsValue {
    /// Group parent; the value lives in the members.
    Group,
    Numeric(f64),
    Text(String),
    Coded(ConceptId),
    Datetime(Timestamp),
}

/// A single observation node.
///
/// Non-leaf obs (groups) list their children in `group_members`, in insertion
/// order; each child points back through `obs_group`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obs {
    pub id: ObsId,
    pub concept: ConceptId,
    pub person: PersonId,
    pub encounter: Option<EncounterId>,
    pub obs_datetime: Timestamp,
    pub location: Option<LocationId>,
    pub value: ObsValue,
    pub obs_group: Option<ObsId>,
    pub group_members: Vec<ObsId>,
    pub previous_version: Option<ObsId>,
    /// Order this obs was recorded against. Never followed by relocation.
    pub order: Option<OrderId>,
    pub void: Option<VoidInfo>,
}

impl Obs {
    pub fn new(person: PersonId, concept: ConceptId, value: ObsValue, obs_datetime: Timestamp) -> Self {
        Self {
            id: ObsId::new(),
            concept,
            person,
            encounter: None,
            obs_datetime,
            location: None,
            value,
            obs_group: None,
            group_members: Vec::new(),
            previous_version: None,
            order: None,
            void: None,
        }
    }

    pub fn in_encounter(mut self, encounter: EncounterId) -> Self {
        self.encounter = Some(encounter);
        self
    }

    pub fn is_group(&self) -> bool {
        !self.group_members.is_empty()
    }

    pub fn is_top_level(&self) -> bool {
        self.obs_group.is_none()
    }
}

crate::impl_voidable!(Obs);

/// Id-keyed storage for obs nodes that remembers insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObsArena {
    nodes: HashMap<ObsId, Obs>,
    order: Vec<ObsId>,
}

impl ObsArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a node. Replacing keeps the original position.
    pub fn insert(&mut self, obs: Obs) {
        let id = obs.id;
        if self.nodes.insert(id, obs).is_none() {
            self.order.push(id);
        }
    }

    /// Inserts `child` as the last group member of `parent`.
    ///
    /// Returns false (and inserts nothing) if the parent is unknown.
    pub fn insert_member(&mut self, parent: ObsId, mut child: Obs) -> bool {
        let Some(parent_node) = self.nodes.get_mut(&parent) else {
            return false;
        };
        parent_node.group_members.push(child.id);
        child.obs_group = Some(parent);
        child.encounter = parent_node.encounter;
        self.insert(child);
        true
    }

    pub fn get(&self, id: &ObsId) -> Option<&Obs> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &ObsId) -> Option<&mut Obs> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &ObsId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Obs> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Top-level nodes in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = &Obs> {
        self.iter().filter(|o| o.is_top_level())
    }

    /// Non-voided nodes owned by `person`.
    pub fn active_for(&self, person: PersonId) -> impl Iterator<Item = &Obs> {
        self.iter().filter(move |o| o.person == person && !o.is_voided())
    }

    /// Merges another arena in, keeping this arena's nodes on id clashes.
    pub fn absorb(&mut self, other: ObsArena) {
        let ObsArena { mut nodes, order } = other;
        for id in order {
            if self.contains(&id) {
                continue;
            }
            if let Some(obs) = nodes.remove(&id) {
                self.insert(obs);
            }
        }
    }
}
