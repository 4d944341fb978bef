//! Authentication gate for protected routes

use axum::{
    Json,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::context::SessionContext;

/// Reject requests whose session is not authenticated.
pub async fn require_auth(req: Request, next: Next) -> Response {
    let authenticated = match req.extensions().get::<SessionContext>() {
        Some(session) => session.auth_user_id().await.is_some(),
        None => false,
    };

    if !authenticated {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "authentication required"})),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_layer::{SessionLayer, session_middleware};
    use axum::{Router, body::Body, http::Request as HttpRequest, http::header, middleware, routing::get};
    use chrono::Duration;
    use directiva_session::{InMemorySessionStore, SessionRecord, SessionStore};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(store: Arc<InMemorySessionStore>) -> Router {
        let layer = SessionLayer::new(store, "directiva_session", Duration::hours(1));
        Router::new()
            .route("/private", get(|| async { "secret" }))
            .layer(middleware::from_fn(require_auth))
            .layer(middleware::from_fn_with_state(layer, session_middleware))
    }

    #[tokio::test]
    async fn test_anonymous_is_401() {
        let response = app(Arc::new(InMemorySessionStore::new()))
            .oneshot(
                HttpRequest::builder()
                    .uri("/private")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authenticated_passes() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut record = SessionRecord::new(Duration::hours(1));
        record.payload.set_auth_user_id(3);
        store.save(&record).await.unwrap();

        let response = app(store)
            .oneshot(
                HttpRequest::builder()
                    .uri("/private")
                    .header(
                        header::COOKIE,
                        format!("directiva_session={}", record.session_key),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
