//! HTTP ingress: session and tenancy middleware
//!
//! The request pipeline assembled by the server is:
//! 1. `session_middleware` - cookie to `SessionContext` extension
//! 2. `tenant_resolver_middleware` - session to `TenantExt` extension
//! 3. `require_auth` - 401 gate for protected routes
//!
//! Handlers downstream read both extensions and never touch shared
//! tenant state.

pub mod auth;
pub mod context;
pub mod resolver;
pub mod session_layer;

pub use auth::require_auth;
pub use context::{SessionContext, TenantExt};
pub use resolver::{ResolverLayer, tenant_resolver_middleware};
pub use session_layer::{
    SessionLayer, clear_session_cookie, session_cookie, session_middleware,
};
