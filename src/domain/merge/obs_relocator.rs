//! Obs tree relocation.
//!
//! Moves a top-level obs and every node beneath it to a new owner as one
//! unit. The walk is an explicit depth-first worklist: children are pushed in
//! reverse so they pop in insertion order, which keeps the relocation order
//! (and therefore the audit) reproducible. Orders referenced by a node are
//! left alone.

use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::domain::clinical::ObsArena;
use crate::domain::foundation::{EncounterId, ObsId, PersonId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObsRelocationError {
    #[error("Obs {0} not found")]
    UnknownRoot(ObsId),

    #[error("Obs {0} is a group member; only whole trees can be relocated")]
    NotTopLevel(ObsId),

    #[error("Obs {parent} lists missing group member {member}")]
    MissingMember { parent: ObsId, member: ObsId },

    #[error("Obs {0} is reachable twice below the same root")]
    Cycle(ObsId),
}

/// Where relocated nodes end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationTarget {
    pub person: PersonId,
    /// When set, every node is re-pointed to this encounter; otherwise each
    /// node keeps its own.
    pub encounter: Option<EncounterId>,
}

impl RelocationTarget {
    pub fn person(person: PersonId) -> Self {
        Self {
            person,
            encounter: None,
        }
    }

    pub fn into_encounter(mut self, encounter: EncounterId) -> Self {
        self.encounter = Some(encounter);
        self
    }
}

pub struct ObsTreeRelocator;

impl ObsTreeRelocator {
    /// Relocates `root` and its whole subtree.
    ///
    /// The tree is walked and validated before any node changes, so on error
    /// the arena is untouched. Returns the relocated ids in depth-first
    /// pre-order.
    pub fn relocate(
        arena: &mut ObsArena,
        root: ObsId,
        target: RelocationTarget,
    ) -> Result<Vec<ObsId>, ObsRelocationError> {
        let subtree = Self::collect(arena, root)?;

        for id in &subtree {
            if let Some(node) = arena.get_mut(id) {
                node.person = target.person;
                if let Some(encounter) = target.encounter {
                    node.encounter = Some(encounter);
                }
                debug!(obs_id = %id, person_id = %target.person, "Relocated obs");
            }
        }

        Ok(subtree)
    }

    /// Ids of `root` and everything beneath it, depth-first pre-order.
    pub fn collect(arena: &ObsArena, root: ObsId) -> Result<Vec<ObsId>, ObsRelocationError> {
        let root_node = arena.get(&root).ok_or(ObsRelocationError::UnknownRoot(root))?;
        if !root_node.is_top_level() {
            return Err(ObsRelocationError::NotTopLevel(root));
        }

        let mut visited = HashSet::new();
        let mut stack = vec![root];
        let mut ordered = Vec::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                return Err(ObsRelocationError::Cycle(current));
            }
            ordered.push(current);

            let node = arena
                .get(&current)
                .ok_or(ObsRelocationError::UnknownRoot(current))?;
            for member in node.group_members.iter().rev() {
                if !arena.contains(member) {
                    return Err(ObsRelocationError::MissingMember {
                        parent: current,
                        member: *member,
                    });
                }
                stack.push(*member);
            }
        }

        Ok(ordered)
    }
}
