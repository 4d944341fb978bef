//! HTTP handlers
//!
//! Policy for degraded operation lives here: credential failures are a
//! clean 401, enforcement and bookkeeping failures are logged and the
//! login proceeds, and nothing from this module ever leaks a database
//! error to the client.

use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use directiva_core::{Error, TenantId, tenant::DEFAULT_TENANT};
use directiva_ingress::{SessionContext, TenantExt, clear_session_cookie, session_cookie};
use directiva_session::enforce_single_session;

use crate::app::AppState;

/// Internal failure surfaced as an opaque 500.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "internal error"})),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmpresaRequest {
    pub empresa: String,
}

pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let Some(user) = state
        .users
        .verify_credentials(&req.username, &req.password)
        .await?
    else {
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid credentials"})),
        )
            .into_response());
    };

    let session_key = session.login(user.id).await?;

    // Older sessions for this user die now; a failure here is logged
    // and the login still succeeds.
    match enforce_single_session(state.session_store.as_ref(), user.id, &session_key).await {
        Ok(stats) if stats.deleted > 0 || stats.delete_failures > 0 => {
            info!(
                user = %user.username,
                deleted = stats.deleted,
                failures = stats.delete_failures,
                "purged concurrent sessions"
            );
        }
        Ok(_) => {}
        Err(err) => {
            warn!(user = %user.username, error = %err, "single-session enforcement failed");
        }
    }

    if let Err(err) = state.users.touch_last_login(user.id).await {
        warn!(user = %user.username, error = %err, "failed to stamp last login");
    }

    let cookie = session_cookie(
        &state.config.session.cookie_name,
        &session_key,
        state.config.session.lifetime_secs,
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({"user_id": user.id, "username": user.username})),
    )
        .into_response())
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    if let Err(err) = session.logout().await {
        warn!(error = %err, "session delete failed during logout");
    }
    (
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.session.cookie_name),
        )],
        Json(json!({"status": "logged out"})),
    )
        .into_response()
}

/// GET /api/me (behind the auth gate)
pub async fn me(Extension(session): Extension<SessionContext>) -> Json<serde_json::Value> {
    let user_id = session.auth_user_id().await;
    let empresa = session
        .tenant_slug()
        .await
        .unwrap_or_else(|| DEFAULT_TENANT.to_string());
    Json(json!({"user_id": user_id, "empresa": empresa}))
}

/// PUT /api/empresa (behind the auth gate)
pub async fn select_empresa(
    Extension(session): Extension<SessionContext>,
    Json(req): Json<EmpresaRequest>,
) -> Result<Response, ApiError> {
    if req.empresa == DEFAULT_TENANT {
        session.with_payload(|p| p.clear_tenant()).await;
    } else {
        if let Err(err) = TenantId::from_string(&req.empresa) {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": err.to_string()})),
            )
                .into_response());
        }
        session
            .with_payload(|p| p.set_tenant_slug(&req.empresa))
            .await;
    }
    session.persist().await?;
    Ok(Json(json!({"empresa": req.empresa})).into_response())
}

/// GET /api/empresa/ping (behind the auth gate)
///
/// Runs a trivial query against the request's tenant database, proving
/// the resolver picked the right store.
pub async fn empresa_ping(
    Extension(tenant): Extension<TenantExt>,
) -> Result<Json<serde_json::Value>, ApiError> {
    sqlx::query("SELECT 1")
        .execute(&tenant.0.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    let empresa = tenant
        .0
        .tenant
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| DEFAULT_TENANT.to_string());
    Ok(Json(json!({
        "status": "ok",
        "empresa": empresa,
        "storage_target": tenant.0.storage_target(),
    })))
}
