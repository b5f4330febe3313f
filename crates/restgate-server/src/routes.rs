//! Route definitions.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the gateway router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/rest/v1/{table}",
            get(handlers::read)
                .post(handlers::create)
                .patch(handlers::update)
                .delete(handlers::remove),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use pretty_assertions::assert_eq;
    use restgate_audit::{MemorySink, SecurityAuditor};
    use restgate_compiler::QueryCompiler;
    use restgate_core::{LockLevel, SessionConfig};
    use restgate_rls::PoolRegistry;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(auditor: SecurityAuditor) -> AppState {
        AppState::from_parts(
            PoolRegistry::new(),
            QueryCompiler::default(),
            SessionConfig::default(),
            auditor,
        )
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response: Response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_healthz() {
        let app = create_router(state(SecurityAuditor::disabled()));
        let (status, body) = send(
            app,
            Request::get("/healthz").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_missing_project_id_is_rejected() {
        let app = create_router(state(SecurityAuditor::disabled()));
        let (status, body) = send(
            app,
            Request::get("/rest/v1/todos").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "missing_project_id");
    }

    #[tokio::test]
    async fn test_invalid_table_is_rejected() {
        let app = create_router(state(SecurityAuditor::disabled()));
        let (status, body) = send(
            app,
            Request::get("/rest/v1/todos-archive")
                .header("x-project-id", "proj_1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_table");
    }

    #[tokio::test]
    async fn test_unfiltered_patch_is_rejected() {
        let app = create_router(state(SecurityAuditor::disabled()));
        let (status, body) = send(
            app,
            Request::patch("/rest/v1/todos?order=id.desc")
                .header("x-project-id", "proj_1")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"title":"renamed"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "missing_filter");
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let app = create_router(state(SecurityAuditor::disabled()));
        let (status, body) = send(
            app,
            Request::post("/rest/v1/todos")
                .header("x-project-id", "proj_1")
                .body(Body::from("{\"title\":"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_json");
    }

    #[tokio::test]
    async fn test_unknown_project_is_unavailable() {
        let app = create_router(state(SecurityAuditor::disabled()));
        let (status, body) = send(
            app,
            Request::get("/rest/v1/todos?id=eq.1")
                .header("x-project-id", "nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "project_unreachable");
    }

    #[tokio::test]
    async fn test_stripped_columns_reach_the_auditor() {
        let sink = Arc::new(MemorySink::new());
        let app = create_router(state(SecurityAuditor::with_sink(sink.clone())));
        let (status, _) = send(
            app,
            Request::post("/rest/v1/todos")
                .header("x-project-id", "proj_1")
                .header("x-caller-role", "authenticated")
                .header("x-forwarded-for", "198.51.100.3")
                .header("x-column-locks", r#"{"owner_id":"immutable"}"#)
                .body(Body::from(r#"{"owner_id":"u2","title":"hi"}"#))
                .unwrap(),
        )
        .await;
        // No pool is registered, so the write itself never runs.
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        for _ in 0..100 {
            if !sink.events().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].project_id, "proj_1");
        assert_eq!(events[0].column_name, "owner_id");
        assert_eq!(events[0].attempted_value, "u2");
        assert_eq!(events[0].lock_level, LockLevel::Immutable);
        assert_eq!(events[0].source_ip.as_deref(), Some("198.51.100.3"));
    }
}
