//! Single-session enforcement
//!
//! Invoked synchronously by the login flow after the fresh session has
//! been persisted. Deletes every other live session belonging to the
//! same user, so that at most one session per user survives a login.
//!
//! This is an explicit hook with a typed result: the caller decides
//! whether an enforcement failure is logged, surfaced, or ignored. The
//! login flow logs a warning and proceeds.

use tracing::warn;

use directiva_core::Result;

use crate::payload::SessionPayload;
use crate::store::SessionStore;

/// Outcome of one enforcement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcementStats {
    /// Live foreign sessions examined
    pub scanned: u64,
    /// Sessions belonging to the user that were deleted
    pub deleted: u64,
    /// Records whose payload failed to decode (left untouched)
    pub undecodable: u64,
    /// Matching sessions whose deletion failed
    pub delete_failures: u64,
}

/// Delete every live session belonging to `user_id` except
/// `current_key`.
///
/// The comparison is made on the *string form* of the user id, matching
/// how `_auth_user_id` is stored in the payload. Undecodable records
/// are counted and skipped. Individual deletion failures are logged and
/// counted but do not abort the pass; deletions are independent and
/// commutative, so the survivors are picked up by the next login.
///
/// # Errors
/// - `Error::SessionStore` if the live-session scan itself fails
pub async fn enforce_single_session(
    store: &dyn SessionStore,
    user_id: i64,
    current_key: &str,
) -> Result<EnforcementStats> {
    let needle = user_id.to_string();
    let mut stats = EnforcementStats::default();

    for record in store.live_sessions().await? {
        if record.session_key == current_key {
            continue;
        }
        stats.scanned += 1;

        let payload = match SessionPayload::decode(&record.encoded_payload) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    session_key = %record.session_key,
                    error = %err,
                    "skipping undecodable session during enforcement"
                );
                stats.undecodable += 1;
                continue;
            }
        };

        if payload.auth_user_id() != Some(needle.as_str()) {
            continue;
        }

        match store.delete(&record.session_key).await {
            Ok(()) => stats.deleted += 1,
            Err(err) => {
                warn!(
                    session_key = %record.session_key,
                    user_id,
                    error = %err,
                    "failed to delete concurrent session"
                );
                stats.delete_failures += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySessionStore;
    use crate::record::SessionRecord;
    use chrono::{Duration, Utc};

    async fn seeded_session(store: &InMemorySessionStore, user_id: Option<i64>) -> SessionRecord {
        let mut record = SessionRecord::new(Duration::hours(1));
        if let Some(id) = user_id {
            record.payload.set_auth_user_id(id);
        }
        store.save(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_only_current_session_survives() {
        let store = InMemorySessionStore::new();
        let old_a = seeded_session(&store, Some(7)).await;
        let old_b = seeded_session(&store, Some(7)).await;
        let other_user = seeded_session(&store, Some(8)).await;
        let current = seeded_session(&store, Some(7)).await;

        let stats = enforce_single_session(&store, 7, &current.session_key)
            .await
            .unwrap();

        assert_eq!(stats.deleted, 2);
        assert_eq!(stats.delete_failures, 0);
        assert!(store.load(&old_a.session_key).await.unwrap().is_none());
        assert!(store.load(&old_b.session_key).await.unwrap().is_none());
        assert!(store.load(&other_user.session_key).await.unwrap().is_some());
        assert!(store.load(&current.session_key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_anonymous_sessions_untouched() {
        let store = InMemorySessionStore::new();
        let anonymous = seeded_session(&store, None).await;
        let current = seeded_session(&store, Some(7)).await;

        let stats = enforce_single_session(&store, 7, &current.session_key)
            .await
            .unwrap();

        assert_eq!(stats.deleted, 0);
        assert!(store.load(&anonymous.session_key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_not_scanned() {
        let store = InMemorySessionStore::new();
        let mut expired = SessionRecord::new(Duration::hours(1));
        expired.payload.set_auth_user_id(7);
        expired.expire_date = Utc::now() - Duration::hours(1);
        store.save(&expired).await.unwrap();
        let current = seeded_session(&store, Some(7)).await;

        let stats = enforce_single_session(&store, 7, &current.session_key)
            .await
            .unwrap();

        assert_eq!(stats.scanned, 0);
        assert_eq!(stats.deleted, 0);
    }

    #[tokio::test]
    async fn test_undecodable_records_are_counted_and_kept() {
        let store = InMemorySessionStore::new();
        store
            .insert_raw("corrupt0000000000000000000000000", "!!not-base64!!")
            .await;
        let current = seeded_session(&store, Some(7)).await;

        let stats = enforce_single_session(&store, 7, &current.session_key)
            .await
            .unwrap();

        assert_eq!(stats.undecodable, 1);
        assert_eq!(stats.deleted, 0);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_string_form_comparison_contract() {
        // A payload that stores the user id as a JSON number must not
        // match: the enforcement contract compares stored string forms.
        let store = InMemorySessionStore::new();
        let mut numeric = SessionRecord::new(Duration::hours(1));
        numeric
            .payload
            .set(crate::payload::AUTH_USER_KEY, serde_json::json!(7));
        store.save(&numeric).await.unwrap();
        let current = seeded_session(&store, Some(7)).await;

        let stats = enforce_single_session(&store, 7, &current.session_key)
            .await
            .unwrap();

        assert_eq!(stats.deleted, 0);
        assert!(store.load(&numeric.session_key).await.unwrap().is_some());
    }
}
