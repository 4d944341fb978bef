//! Session store trait
//!
//! The `SessionStore` trait abstracts over session persistence so the
//! HTTP layer and the enforcement hook work against SQLite in
//! production and an in-memory double in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use directiva_core::Result;

use crate::record::SessionRecord;

/// A session row as stored: the payload is still encoded.
///
/// Scans hand these out undecoded so that the caller owns the policy
/// for records that fail to decode (the enforcement hook counts them
/// and moves on rather than failing the whole scan).
#[derive(Debug, Clone)]
pub struct EncodedSession {
    pub session_key: String,
    pub expire_date: DateTime<Utc>,
    pub encoded_payload: String,
}

/// Session persistence backend.
///
/// Implementations:
/// - `SqliteSessionStore` (directiva-session-sqlite): production store
/// - `InMemorySessionStore`: test double
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or update a session record.
    ///
    /// # Errors
    /// - `Error::SessionStore` for write errors
    async fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Load a session by key, decoding its payload.
    ///
    /// Returns `None` for unknown keys and for records whose expiry has
    /// passed; an expired session and no session are indistinguishable
    /// to callers.
    ///
    /// # Errors
    /// - `Error::SessionStore` for read errors and undecodable payloads
    async fn load(&self, session_key: &str) -> Result<Option<SessionRecord>>;

    /// Delete a session by key. Deleting an absent key is not an error.
    ///
    /// # Errors
    /// - `Error::SessionStore` for write errors
    async fn delete(&self, session_key: &str) -> Result<()>;

    /// All records whose expiry is in the future, payloads undecoded.
    ///
    /// # Errors
    /// - `Error::SessionStore` for read errors
    async fn live_sessions(&self) -> Result<Vec<EncodedSession>>;

    /// Delete every record whose expiry has passed, returning the count.
    ///
    /// # Errors
    /// - `Error::SessionStore` for write errors
    async fn delete_expired(&self) -> Result<u64>;

    /// Total number of stored records, expired ones included.
    ///
    /// # Errors
    /// - `Error::SessionStore` for read errors
    async fn count(&self) -> Result<u64>;
}
