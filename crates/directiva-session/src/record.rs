//! Session records and key generation

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::payload::SessionPayload;

/// Length of generated session keys.
const SESSION_KEY_LEN: usize = 32;

/// A server-side session: an opaque key, an expiry, and the decoded
/// payload map.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Opaque identifier, also the cookie value
    pub session_key: String,
    /// Records at or past this instant are treated as gone
    pub expire_date: DateTime<Utc>,
    pub payload: SessionPayload,
}

impl SessionRecord {
    /// Create a fresh anonymous session expiring `lifetime` from now.
    pub fn new(lifetime: Duration) -> Self {
        Self {
            session_key: generate_session_key(),
            expire_date: Utc::now() + lifetime,
            payload: SessionPayload::default(),
        }
    }

    /// Whether this record's expiry is still in the future.
    pub fn is_live(&self) -> bool {
        self.expire_date > Utc::now()
    }

    /// Replace the session key with a newly generated one.
    ///
    /// Called on every successful login so that a pre-login cookie can
    /// never name a post-login session (session fixation).
    pub fn cycle_key(&mut self) {
        self.session_key = generate_session_key();
    }
}

/// Generate an opaque session key: 32 alphanumeric characters from the
/// thread RNG.
pub fn generate_session_key() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_KEY_LEN)
        .map(char::from)
        .collect()
}
