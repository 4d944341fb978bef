//! In-memory session store
//!
//! Test double for `SessionStore`. Also handy for ephemeral local runs
//! where sessions are allowed to vanish on restart.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use directiva_core::{Error, Result};

use crate::record::SessionRecord;
use crate::store::{EncodedSession, SessionStore};

#[derive(Default)]
pub struct InMemorySessionStore {
    records: RwLock<HashMap<String, EncodedSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw row, bypassing payload encoding. Lets tests plant
    /// corrupt records the way a broken writer would.
    pub async fn insert_raw(&self, session_key: &str, encoded_payload: &str) {
        self.records.write().await.insert(
            session_key.to_string(),
            EncodedSession {
                session_key: session_key.to_string(),
                expire_date: Utc::now() + chrono::Duration::hours(1),
                encoded_payload: encoded_payload.to_string(),
            },
        );
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, record: &SessionRecord) -> Result<()> {
        self.records.write().await.insert(
            record.session_key.clone(),
            EncodedSession {
                session_key: record.session_key.clone(),
                expire_date: record.expire_date,
                encoded_payload: record.payload.encode(),
            },
        );
        Ok(())
    }

    async fn load(&self, session_key: &str) -> Result<Option<SessionRecord>> {
        let records = self.records.read().await;
        let Some(row) = records.get(session_key) else {
            return Ok(None);
        };
        if row.expire_date <= Utc::now() {
            return Ok(None);
        }
        let payload = crate::payload::SessionPayload::decode(&row.encoded_payload)
            .map_err(|e| Error::SessionStore(format!("undecodable payload: {}", e)))?;
        Ok(Some(SessionRecord {
            session_key: row.session_key.clone(),
            expire_date: row.expire_date,
            payload,
        }))
    }

    async fn delete(&self, session_key: &str) -> Result<()> {
        self.records.write().await.remove(session_key);
        Ok(())
    }

    async fn live_sessions(&self) -> Result<Vec<EncodedSession>> {
        let now = Utc::now();
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|row| row.expire_date > now)
            .cloned()
            .collect())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, row| row.expire_date > now);
        Ok((before - records.len()) as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.read().await.len() as u64)
    }
}
