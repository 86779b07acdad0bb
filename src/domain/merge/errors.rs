//! Merge error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, PersonId};

use super::EntityKind;

/// The two identities taking part in a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergePair {
    pub preferred: PersonId,
    pub non_preferred: PersonId,
}

impl MergePair {
    pub fn new(preferred: PersonId, non_preferred: PersonId) -> Self {
        Self {
            preferred,
            non_preferred,
        }
    }

    /// Both ids in ascending order; the order locks must be taken in.
    pub fn lock_order(&self) -> [PersonId; 2] {
        if self.preferred <= self.non_preferred {
            [self.preferred, self.non_preferred]
        } else {
            [self.non_preferred, self.preferred]
        }
    }
}

impl fmt::Display for MergePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "preferred {} / non-preferred {}",
            self.preferred, self.non_preferred
        )
    }
}

/// Errors raised by a merge.
///
/// Precondition failures (`IdentityEquality`, `VoidedIdentity`,
/// `ConflictingActiveOrder`, `NotFound`) are raised before any mutation.
/// Everything else aborts and rolls back the whole merge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("Cannot merge identity {0} with itself")]
    IdentityEquality(PersonId),

    #[error("Cannot merge {pair}: identity {voided} is voided")]
    VoidedIdentity { pair: MergePair, voided: PersonId },

    #[error("Cannot merge {pair}: both identities have active orders of type '{order_type}'")]
    ConflictingActiveOrder { pair: MergePair, order_type: String },

    #[error("Cannot merge {pair}: identity {missing} not found")]
    NotFound { pair: MergePair, missing: PersonId },

    #[error("Invalid identifier '{value}' at {kind} while merging {pair}: {reason}")]
    InvalidIdentifier {
        pair: MergePair,
        kind: EntityKind,
        value: String,
        reason: String,
    },

    #[error("Cannot merge {pair}: identity {person} changed while the merge was running")]
    ConcurrentModification { pair: MergePair, person: PersonId },

    #[error("Locked configuration for {kind} while merging {pair}: {message}")]
    LockedConfiguration {
        pair: MergePair,
        kind: EntityKind,
        message: String,
    },

    #[error("Merge of {pair} failed at {kind}: {message}")]
    Infrastructure {
        pair: MergePair,
        kind: EntityKind,
        message: String,
    },
}

impl MergeError {
    /// Maps a port error onto the taxonomy, attaching merge context.
    pub fn from_domain(err: DomainError, pair: MergePair, kind: EntityKind) -> Self {
        match err.code {
            ErrorCode::PersonNotFound => {
                let missing = err
                    .detail("person_id")
                    .and_then(|id| id.parse().ok())
                    .unwrap_or(pair.non_preferred);
                MergeError::NotFound { pair, missing }
            }
            ErrorCode::InvalidIdentifier | ErrorCode::EmptyField => MergeError::InvalidIdentifier {
                pair,
                kind,
                value: err.detail("identifier").unwrap_or_default().to_string(),
                reason: err.message,
            },
            ErrorCode::ConcurrentModification => {
                let person = err
                    .detail("person_id")
                    .and_then(|id| id.parse().ok())
                    .unwrap_or(pair.preferred);
                MergeError::ConcurrentModification { pair, person }
            }
            ErrorCode::ConfigurationLocked => MergeError::LockedConfiguration {
                pair,
                kind,
                message: err.message,
            },
            _ => MergeError::Infrastructure {
                pair,
                kind,
                message: err.to_string(),
            },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            MergeError::IdentityEquality(_) => ErrorCode::IdentityEquality,
            MergeError::VoidedIdentity { .. } => ErrorCode::VoidedIdentity,
            MergeError::ConflictingActiveOrder { .. } => ErrorCode::ConflictingActiveOrder,
            MergeError::NotFound { .. } => ErrorCode::PersonNotFound,
            MergeError::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifier,
            MergeError::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
            MergeError::LockedConfiguration { .. } => ErrorCode::ConfigurationLocked,
            MergeError::Infrastructure { .. } => ErrorCode::InternalError,
        }
    }

    /// True for failures detected before any mutation.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            MergeError::IdentityEquality(_)
                | MergeError::VoidedIdentity { .. }
                | MergeError::ConflictingActiveOrder { .. }
                | MergeError::NotFound { .. }
        )
    }
}
