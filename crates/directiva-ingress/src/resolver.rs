//! Tenant resolver middleware
//!
//! Turns the session's `empresa_db` selection into a `TenantExt`
//! request extension. Resolution failures never fail the request: the
//! bad selection is cleared from the session and the request proceeds
//! against the control database.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use directiva_core::{Result, TenantId, tenant::DEFAULT_TENANT};
use directiva_tenancy::{TenantHandle, TenantRegistry};

use crate::context::{SessionContext, TenantExt};

/// State for [`tenant_resolver_middleware`].
#[derive(Clone)]
pub struct ResolverLayer {
    pub registry: Arc<TenantRegistry>,
}

/// Attach the tenant database handle for this request.
///
/// Unauthenticated sessions and sessions without a tenant selection
/// (or with the `"default"` sentinel) get the control database. An
/// invalid or unresolvable selection is logged, removed from the
/// session, and likewise degrades to the control database.
pub async fn tenant_resolver_middleware(
    State(layer): State<ResolverLayer>,
    mut req: Request,
    next: Next,
) -> Response {
    let handle = match req.extensions().get::<SessionContext>() {
        Some(session) => resolve_for_session(&layer.registry, session).await,
        None => layer.registry.default_handle(),
    };
    req.extensions_mut().insert(TenantExt(handle));
    next.run(req).await
}

async fn resolve_for_session(
    registry: &TenantRegistry,
    session: &SessionContext,
) -> Arc<TenantHandle> {
    if session.auth_user_id().await.is_none() {
        return registry.default_handle();
    }
    let Some(slug) = session.tenant_slug().await else {
        return registry.default_handle();
    };
    if slug == DEFAULT_TENANT {
        return registry.default_handle();
    }

    match resolve_slug(registry, &slug).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(
                empresa = %slug,
                error = %err,
                "tenant resolution failed, falling back to control database"
            );
            session.with_payload(|p| p.clear_tenant()).await;
            if let Err(save_err) = session.persist().await {
                warn!(error = %save_err, "failed to clear bad tenant selection");
            }
            registry.default_handle()
        }
    }
}

async fn resolve_slug(registry: &TenantRegistry, slug: &str) -> Result<Arc<TenantHandle>> {
    let tenant = TenantId::from_string(slug)?;
    registry.resolve(&tenant).await
}
