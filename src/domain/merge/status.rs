//! Merge run lifecycle.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Where a merge run is in its lifecycle.
///
/// ```text
/// Validating ──► Migrating ──► Finalizing ──► Sealed
///     │              │              │
///     ▼              └──────┬───────┘
/// Rejected                  ▼
///                       RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    #[default]
    Validating,
    Migrating,
    Finalizing,
    Sealed,
    Rejected,
    RolledBack,
}

impl MergeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, MergeStatus::Sealed)
    }
}

impl StateMachine for MergeStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use MergeStatus::*;
        matches!(
            (self, target),
            (Validating, Migrating)
                | (Validating, Rejected)
                | (Migrating, Finalizing)
                | (Migrating, RolledBack)
                | (Finalizing, Sealed)
                | (Finalizing, RolledBack)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use MergeStatus::*;
        match self {
            Validating => vec![Migrating, Rejected],
            Migrating => vec![Finalizing, RolledBack],
            Finalizing => vec![Sealed, RolledBack],
            Sealed | Rejected | RolledBack => vec![],
        }
    }
}
