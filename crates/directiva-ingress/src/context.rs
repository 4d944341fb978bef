//! Request-extension context types

use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use directiva_core::Result;
use directiva_session::{SessionPayload, SessionRecord, SessionStore};
use directiva_tenancy::TenantHandle;

/// Extension carrying the resolved tenant database handle.
#[derive(Clone)]
pub struct TenantExt(pub Arc<TenantHandle>);

/// Extension carrying the request's session.
///
/// The record lives behind a lock so the resolver middleware and the
/// handler can both touch it; mutations stay in memory until
/// [`SessionContext::persist`] writes them through to the store.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    record: Arc<RwLock<SessionRecord>>,
    lifetime: Duration,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>, record: SessionRecord, lifetime: Duration) -> Self {
        Self {
            store,
            record: Arc::new(RwLock::new(record)),
            lifetime,
        }
    }

    pub async fn session_key(&self) -> String {
        self.record.read().await.session_key.clone()
    }

    pub async fn auth_user_id(&self) -> Option<String> {
        self.record
            .read()
            .await
            .payload
            .auth_user_id()
            .map(str::to_string)
    }

    pub async fn tenant_slug(&self) -> Option<String> {
        self.record
            .read()
            .await
            .payload
            .tenant_slug()
            .map(str::to_string)
    }

    /// Mutate the payload in memory. Call [`persist`](Self::persist) to
    /// write the change through.
    pub async fn with_payload<T>(&self, f: impl FnOnce(&mut SessionPayload) -> T) -> T {
        let mut record = self.record.write().await;
        f(&mut record.payload)
    }

    /// Write the current record through to the store.
    ///
    /// # Errors
    /// - `Error::SessionStore` on write failure
    pub async fn persist(&self) -> Result<()> {
        let record = self.record.read().await;
        self.store.save(&record).await
    }

    /// Authenticate this session as `user_id`.
    ///
    /// Rotates the session key, stamps the user id into the payload,
    /// extends the expiry by the configured lifetime, and persists.
    /// The record stored under the pre-login key (if any) is deleted so
    /// the old cookie value dies with the rotation. Returns the new
    /// session key for the cookie.
    ///
    /// # Errors
    /// - `Error::SessionStore` on write failure
    pub async fn login(&self, user_id: i64) -> Result<String> {
        let (old_key, new_key) = {
            let mut record = self.record.write().await;
            let old_key = record.session_key.clone();
            record.cycle_key();
            record.expire_date = Utc::now() + self.lifetime;
            record.payload.set_auth_user_id(user_id);
            (old_key, record.session_key.clone())
        };
        self.persist().await?;
        if let Err(err) = self.store.delete(&old_key).await {
            tracing::warn!(error = %err, "failed to drop pre-login session record");
        }
        Ok(new_key)
    }

    /// Destroy this session in the store and reset the in-memory record
    /// to a fresh anonymous one.
    ///
    /// # Errors
    /// - `Error::SessionStore` on delete failure
    pub async fn logout(&self) -> Result<()> {
        let old_key = self.session_key().await;
        self.store.delete(&old_key).await?;
        let mut record = self.record.write().await;
        *record = SessionRecord::new(self.lifetime);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directiva_session::InMemorySessionStore;

    fn context(store: Arc<InMemorySessionStore>) -> SessionContext {
        let record = SessionRecord::new(Duration::hours(1));
        SessionContext::new(store, record, Duration::hours(1))
    }

    #[tokio::test]
    async fn test_login_rotates_key_and_persists() {
        let store = Arc::new(InMemorySessionStore::new());
        let ctx = context(store.clone());
        let anonymous_key = ctx.session_key().await;

        let new_key = ctx.login(9).await.unwrap();

        assert_ne!(new_key, anonymous_key);
        assert_eq!(ctx.auth_user_id().await, Some("9".to_string()));
        let stored = store.load(&new_key).await.unwrap().unwrap();
        assert_eq!(stored.payload.auth_user_id(), Some("9"));
        // The pre-login key was never persisted.
        assert!(store.load(&anonymous_key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_relogin_drops_previous_record() {
        let store = Arc::new(InMemorySessionStore::new());
        let ctx = context(store.clone());
        let first = ctx.login(9).await.unwrap();
        let second = ctx.login(9).await.unwrap();

        assert_ne!(first, second);
        assert!(store.load(&first).await.unwrap().is_none());
        assert!(store.load(&second).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_logout_deletes_and_resets() {
        let store = Arc::new(InMemorySessionStore::new());
        let ctx = context(store.clone());
        let key = ctx.login(9).await.unwrap();

        ctx.logout().await.unwrap();

        assert!(store.load(&key).await.unwrap().is_none());
        assert_eq!(ctx.auth_user_id().await, None);
        assert_ne!(ctx.session_key().await, key);
    }

    #[tokio::test]
    async fn test_payload_mutation_requires_persist() {
        let store = Arc::new(InMemorySessionStore::new());
        let ctx = context(store.clone());
        let key = ctx.login(9).await.unwrap();

        ctx.with_payload(|p| p.set_tenant_slug("ejido-norte")).await;
        let stored = store.load(&key).await.unwrap().unwrap();
        assert_eq!(stored.payload.tenant_slug(), None);

        ctx.persist().await.unwrap();
        let stored = store.load(&key).await.unwrap().unwrap();
        assert_eq!(stored.payload.tenant_slug(), Some("ejido-norte"));
    }
}
