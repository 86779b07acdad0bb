//! HTTP DTOs for merge endpoints.
//!
//! Responses carry the sealed audit document as-is; errors use a flat
//! code/message body.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, PersonId};
use crate::domain::merge::{MergeError, MergePair};

/// Request to merge two identities.
///
/// Ids are taken as strings so malformed values map to `400` rather than a
/// body rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub preferred_id: String,
    pub non_preferred_id: String,
}

impl MergeRequest {
    pub fn ids(&self) -> Result<(PersonId, PersonId), String> {
        let preferred = self
            .preferred_id
            .parse()
            .map_err(|_| format!("Invalid preferred_id: {}", self.preferred_id))?;
        let non_preferred = self
            .non_preferred_id
            .parse()
            .map_err(|_| format!("Invalid non_preferred_id: {}", self.non_preferred_id))?;
        Ok((preferred, non_preferred))
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(resource_type: &str, id: &str) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            message: format!("{} not found: {}", resource_type, id),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<&MergeError> for ErrorResponse {
    fn from(err: &MergeError) -> Self {
        let pair = match err {
            MergeError::IdentityEquality(id) => MergePair::new(*id, *id),
            MergeError::VoidedIdentity { pair, .. }
            | MergeError::ConflictingActiveOrder { pair, .. }
            | MergeError::NotFound { pair, .. }
            | MergeError::InvalidIdentifier { pair, .. }
            | MergeError::ConcurrentModification { pair, .. }
            | MergeError::LockedConfiguration { pair, .. }
            | MergeError::Infrastructure { pair, .. } => *pair,
        };
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            details: Some(serde_json::json!({
                "preferred_id": pair.preferred,
                "non_preferred_id": pair.non_preferred,
            })),
        }
    }
}

impl From<&DomainError> for ErrorResponse {
    fn from(err: &DomainError) -> Self {
        Self {
            code: err.code.to_string(),
            message: err.message.clone(),
            details: None,
        }
    }
}
