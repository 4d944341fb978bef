//! Expired-session cleanup
//!
//! A background loop that periodically deletes expired session records,
//! plus a one-shot entry point for the CLI.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use directiva_core::Result;

use crate::store::SessionStore;

/// Delete expired sessions once, returning the number removed.
pub async fn purge_expired(store: &dyn SessionStore) -> Result<u64> {
    store.delete_expired().await
}

/// Spawn the periodic cleanup task.
///
/// Runs until the process exits; failures are logged and the loop keeps
/// going, since a missed pass only delays reclamation.
pub fn spawn_cleanup_task(store: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "session cleanup task started");
        loop {
            sleep(interval).await;
            match store.delete_expired().await {
                Ok(0) => debug!("session cleanup pass: nothing expired"),
                Ok(n) => info!(deleted = n, "session cleanup pass"),
                Err(err) => warn!(error = %err, "session cleanup pass failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySessionStore;
    use crate::record::SessionRecord;
    use chrono::Utc;

    #[tokio::test]
    async fn test_purge_expired_counts() {
        let store = InMemorySessionStore::new();
        let mut expired = SessionRecord::new(chrono::Duration::hours(1));
        expired.expire_date = Utc::now() - chrono::Duration::minutes(1);
        store.save(&expired).await.unwrap();
        store
            .save(&SessionRecord::new(chrono::Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(purge_expired(&store).await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
