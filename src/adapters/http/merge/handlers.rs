//! HTTP handlers for merge endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::application::handlers::merge::{
    GetMergeAuditHandler, GetMergeAuditQuery, ListPersonMergesQuery, MergeIdentitiesCommand,
    MergeIdentitiesHandler,
};
use crate::domain::foundation::{ActingUser, DomainError, ErrorCode, MergeId, PersonId};
use crate::domain::merge::MergeError;

use super::dto::{ErrorResponse, MergeRequest};

/// Header carrying the acting user.
pub const ACTING_USER_HEADER: &str = "x-acting-user";

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct MergeHandlers {
    merge_handler: Arc<MergeIdentitiesHandler>,
    audit_handler: Arc<GetMergeAuditHandler>,
}

impl MergeHandlers {
    pub fn new(
        merge_handler: Arc<MergeIdentitiesHandler>,
        audit_handler: Arc<GetMergeAuditHandler>,
    ) -> Self {
        Self {
            merge_handler,
            audit_handler,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /merges - Merge the non-preferred identity into the preferred one
pub async fn merge_identities(
    State(handlers): State<MergeHandlers>,
    headers: HeaderMap,
    body: Result<Json<MergeRequest>, JsonRejection>,
) -> Response {
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(message) => return bad_request(message),
    };
    let Json(req) = match body {
        Ok(req) => req,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let (preferred_id, non_preferred_id) = match req.ids() {
        Ok(ids) => ids,
        Err(message) => return bad_request(message),
    };

    let cmd = MergeIdentitiesCommand {
        preferred_id,
        non_preferred_id,
    };

    match handlers.merge_handler.handle(cmd, user).await {
        Ok(result) => (StatusCode::CREATED, Json(result.audit)).into_response(),
        Err(e) => handle_merge_error(e),
    }
}

/// GET /merges/:id - Sealed audit of one merge
pub async fn get_merge(
    State(handlers): State<MergeHandlers>,
    Path(merge_id): Path<String>,
) -> Response {
    let merge_id = match merge_id.parse::<MergeId>() {
        Ok(id) => id,
        Err(_) => return bad_request("Invalid merge ID"),
    };

    match handlers
        .audit_handler
        .handle(GetMergeAuditQuery { merge_id })
        .await
    {
        Ok(audit) => (StatusCode::OK, Json(audit)).into_response(),
        Err(e) => handle_domain_error(e),
    }
}

/// GET /persons/:id/merges - Every merge the identity took part in
pub async fn list_person_merges(
    State(handlers): State<MergeHandlers>,
    Path(person_id): Path<String>,
) -> Response {
    let person_id = match person_id.parse::<PersonId>() {
        Ok(id) => id,
        Err(_) => return bad_request("Invalid person ID"),
    };

    match handlers
        .audit_handler
        .list_for_person(ListPersonMergesQuery { person_id })
        .await
    {
        Ok(audits) => (StatusCode::OK, Json(audits)).into_response(),
        Err(e) => handle_domain_error(e),
    }
}

fn acting_user(headers: &HeaderMap) -> Result<ActingUser, String> {
    let value = headers
        .get(ACTING_USER_HEADER)
        .ok_or_else(|| format!("Missing {} header", ACTING_USER_HEADER))?
        .to_str()
        .map_err(|_| format!("Invalid {} header", ACTING_USER_HEADER))?;
    ActingUser::new(value).map_err(|e| e.to_string())
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::bad_request(message)),
    )
        .into_response()
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn merge_error_status(error: &MergeError) -> StatusCode {
    match error {
        MergeError::IdentityEquality(_)
        | MergeError::VoidedIdentity { .. }
        | MergeError::ConflictingActiveOrder { .. }
        | MergeError::ConcurrentModification { .. } => StatusCode::CONFLICT,
        MergeError::NotFound { .. } => StatusCode::NOT_FOUND,
        MergeError::InvalidIdentifier { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MergeError::LockedConfiguration { .. } => StatusCode::LOCKED,
        MergeError::Infrastructure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn handle_merge_error(error: MergeError) -> Response {
    (merge_error_status(&error), Json(ErrorResponse::from(&error))).into_response()
}

fn handle_domain_error(error: DomainError) -> Response {
    match error.code {
        ErrorCode::MergeNotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found(
                "Merge",
                error.detail("merge_id").unwrap_or_default(),
            )),
        )
            .into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal(error.to_string())),
        )
            .into_response(),
    }
}
