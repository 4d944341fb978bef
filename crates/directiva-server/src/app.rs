//! Application state and router assembly

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use chrono::Duration;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use directiva_ingress::{
    ResolverLayer, SessionLayer, require_auth, session_middleware, tenant_resolver_middleware,
};
use directiva_session::SessionStore;
use directiva_tenancy::TenantRegistry;

use crate::config::ServerConfig;
use crate::handlers;
use crate::users::UserStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub session_store: Arc<dyn SessionStore>,
    pub registry: Arc<TenantRegistry>,
    pub users: Arc<UserStore>,
}

/// Assemble the router with the full middleware pipeline.
///
/// Layer order matters: the session middleware must run before the
/// tenant resolver, which must run before any handler that reads
/// `TenantExt`. Axum applies layers outermost-last, so the session
/// layer is added last.
pub fn build_router(state: AppState) -> Router {
    let session_layer = SessionLayer::new(
        state.session_store.clone(),
        state.config.session.cookie_name.clone(),
        Duration::seconds(state.config.session.lifetime_secs),
    );
    let resolver_layer = ResolverLayer {
        registry: state.registry.clone(),
    };

    let protected = Router::new()
        .route("/api/me", get(handlers::me))
        .route("/api/empresa", put(handlers::select_empresa))
        .route("/api/empresa/ping", get(handlers::empresa_ping))
        .route_layer(middleware::from_fn(require_auth));

    let mut app = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            resolver_layer,
            tenant_resolver_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            session_layer,
            session_middleware,
        ))
        .with_state(state.clone());

    if state.config.logging.log_requests {
        app = app.layer(TraceLayer::new_for_http());
    }

    app
}
