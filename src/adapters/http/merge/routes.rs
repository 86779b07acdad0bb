//! HTTP routes for merge endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{get_merge, list_person_merges, merge_identities, MergeHandlers};

/// Creates the merge router with all endpoints.
pub fn merge_routes(handlers: MergeHandlers) -> Router {
    Router::new()
        .route("/merges", post(merge_identities))
        .route("/merges/:id", get(get_merge))
        .route("/persons/:id/merges", get(list_person_merges))
        .with_state(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::{InMemoryIdentityGraphStore, KeyedIdentityLocker};
    use crate::adapters::search::RecordingSearchIndexer;
    use crate::application::handlers::merge::{GetMergeAuditHandler, MergeIdentitiesHandler};
    use crate::domain::foundation::{PersonId, SystemClock};
    use crate::domain::merge::{MergeAudit, MergeEngine, PersonGraph};
    use crate::domain::person::PersonIdentity;

    async fn app_with(graphs: Vec<PersonGraph>) -> Router {
        let store = Arc::new(InMemoryIdentityGraphStore::new());
        for graph in graphs {
            store.insert_graph(graph).await;
        }
        let merge_handler = MergeIdentitiesHandler::new(
            store.clone(),
            Arc::new(KeyedIdentityLocker::default()),
            Arc::new(RecordingSearchIndexer::new()),
            Arc::new(InMemoryEventBus::new()),
            Arc::new(MergeEngine::default()),
            Arc::new(SystemClock),
        );
        let audit_handler = GetMergeAuditHandler::new(store);
        merge_routes(MergeHandlers::new(
            Arc::new(merge_handler),
            Arc::new(audit_handler),
        ))
    }

    fn patient() -> PersonGraph {
        PersonGraph::new(PersonIdentity::new_patient(PersonId::new()))
    }

    fn merge_request(preferred: PersonId, non_preferred: PersonId, user: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/merges")
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-acting-user", user);
        }
        let body = serde_json::json!({
            "preferred_id": preferred.to_string(),
            "non_preferred_id": non_preferred.to_string(),
        });
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn post_merges_returns_201_with_audit_then_get_finds_it() {
        let p = patient();
        let np = patient();
        let (p_id, np_id) = (p.id(), np.id());
        let app = app_with(vec![p, np]).await;

        let response = app
            .clone()
            .oneshot(merge_request(p_id, np_id, Some("admin")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let audit: MergeAudit = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(audit.preferred(), p_id);
        assert_eq!(audit.created_by().as_str(), "admin");

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/merges/{}", audit.id()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_merges_without_acting_user_is_400() {
        let app = app_with(vec![]).await;

        let response = app
            .oneshot(merge_request(PersonId::new(), PersonId::new(), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn self_merge_is_409_and_unknown_identity_is_404() {
        let p = patient();
        let p_id = p.id();
        let app = app_with(vec![p]).await;

        let response = app
            .clone()
            .oneshot(merge_request(p_id, p_id, Some("admin")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .oneshot(merge_request(p_id, PersonId::new(), Some("admin")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_unknown_merge_is_404() {
        let app = app_with(vec![]).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/merges/{}", PersonId::new()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let app = app_with(vec![]).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/merges")
                    .header("content-type", "application/json")
                    .header("x-acting-user", "admin")
                    .body(Body::from("{\"preferred_id\": 1}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
