//! Session middleware: cookie to `SessionContext`

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Duration;
use std::sync::Arc;
use tracing::warn;

use directiva_session::{SessionRecord, SessionStore};

use crate::context::SessionContext;

/// State for [`session_middleware`], installed with
/// `middleware::from_fn_with_state`.
#[derive(Clone)]
pub struct SessionLayer {
    pub store: Arc<dyn SessionStore>,
    pub cookie_name: String,
    pub lifetime: Duration,
}

impl SessionLayer {
    pub fn new(store: Arc<dyn SessionStore>, cookie_name: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            store,
            cookie_name: cookie_name.into(),
            lifetime,
        }
    }
}

/// Attach a `SessionContext` to every request.
///
/// The session cookie is looked up and loaded from the store. A
/// missing cookie, an unknown or expired key, or a store failure all
/// degrade to a fresh anonymous session; the failure case is logged.
/// Nothing is persisted here, a session only reaches the store once a
/// handler saves it.
pub async fn session_middleware(
    State(layer): State<SessionLayer>,
    mut req: Request,
    next: Next,
) -> Response {
    let record = match cookie_value(&req, &layer.cookie_name) {
        Some(key) => match layer.store.load(&key).await {
            Ok(Some(record)) => record,
            Ok(None) => SessionRecord::new(layer.lifetime),
            Err(err) => {
                warn!(error = %err, "session load failed, continuing anonymous");
                SessionRecord::new(layer.lifetime)
            }
        },
        None => SessionRecord::new(layer.lifetime),
    };

    let context = SessionContext::new(layer.store.clone(), record, layer.lifetime);
    req.extensions_mut().insert(context);
    next.run(req).await
}

/// Extract a cookie value from the request's Cookie headers.
fn cookie_value(req: &Request, name: &str) -> Option<String> {
    for header in req.headers().get_all(header::COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((k, v)) = pair.trim().split_once('=')
                && k == name
                && !v.is_empty()
            {
                return Some(v.to_string());
            }
        }
    }
    None
}

/// Set-Cookie value for a fresh session key.
pub fn session_cookie(name: &str, session_key: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        name, session_key, max_age_secs
    )
}

/// Set-Cookie value that expires the session cookie.
pub fn clear_session_cookie(name: &str) -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", name)
}
