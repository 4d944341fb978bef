//! Tenant registry: tenant ID to pooled database handle

use dashmap::DashMap;
use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use directiva_core::{Error, Result, TenantId};

use crate::descriptor::{ConnectionDescriptor, DbEngine};

/// A resolved tenant database: descriptor plus a live pool.
///
/// Handles travel with the request (as an extension), never through
/// shared mutable state. `tenant` is `None` for the control database.
#[derive(Clone)]
pub struct TenantHandle {
    pub tenant: Option<TenantId>,
    pub descriptor: ConnectionDescriptor,
    pub pool: SqlitePool,
}

impl TenantHandle {
    /// Human-readable storage target, for logs and diagnostics.
    pub fn storage_target(&self) -> &str {
        &self.descriptor.target
    }
}

/// Process-wide cache of tenant database handles.
///
/// Construction opens the control database. Tenant stores are opened
/// lazily on first resolution and cached for the life of the process;
/// resolving the same tenant again returns the cached handle without
/// touching the pool.
pub struct TenantRegistry {
    data_dir: PathBuf,
    default_handle: Arc<TenantHandle>,
    tenants: DashMap<TenantId, Arc<TenantHandle>>,
}

impl TenantRegistry {
    /// Open the registry and its control database.
    ///
    /// # Arguments
    /// * `default_descriptor` - the control database ("default" slot)
    /// * `data_dir` - directory where tenant SQLite stores live
    ///
    /// # Errors
    /// - `Error::Config` for a non-SQLite descriptor
    /// - `Error::Database` if the control database cannot be opened
    pub async fn open(
        default_descriptor: ConnectionDescriptor,
        data_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;

        let pool = build_pool(&default_descriptor).await?;
        info!(target = %default_descriptor.target, "control database opened");

        Ok(Self {
            data_dir,
            default_handle: Arc::new(TenantHandle {
                tenant: None,
                descriptor: default_descriptor,
                pool,
            }),
            tenants: DashMap::new(),
        })
    }

    /// Handle for the control database.
    pub fn default_handle(&self) -> Arc<TenantHandle> {
        self.default_handle.clone()
    }

    /// Directory holding tenant SQLite stores.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Resolve a tenant to its database handle, opening the store on
    /// first use.
    ///
    /// Resolution is idempotent: a second call for the same tenant
    /// returns the cached handle (the same `Arc`) and performs no pool
    /// work. Two racing first resolutions may both build a pool; the
    /// loser's pool is dropped and the cache keeps a single winner.
    ///
    /// # Errors
    /// - `Error::Database` if the tenant store cannot be opened
    pub async fn resolve(&self, tenant: &TenantId) -> Result<Arc<TenantHandle>> {
        if let Some(handle) = self.tenants.get(tenant) {
            return Ok(handle.clone());
        }

        let descriptor = ConnectionDescriptor::sqlite(tenant.storage_target(&self.data_dir));
        let pool = build_pool(&descriptor).await?;
        debug!(tenant = %tenant, target = %descriptor.target, "tenant database opened");

        let handle = Arc::new(TenantHandle {
            tenant: Some(tenant.clone()),
            descriptor,
            pool,
        });
        Ok(self
            .tenants
            .entry(tenant.clone())
            .or_insert(handle)
            .clone())
    }

    /// Number of tenant stores opened so far.
    pub fn open_tenants(&self) -> usize {
        self.tenants.len()
    }
}

async fn build_pool(descriptor: &ConnectionDescriptor) -> Result<SqlitePool> {
    if descriptor.engine != DbEngine::Sqlite {
        return Err(Error::Config(format!(
            "engine {:?} is not supported by this deployment; only sqlite targets can be opened",
            descriptor.engine
        )));
    }

    let path = PathBuf::from(&descriptor.target);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    SqlitePoolOptions::new()
        .max_connections(descriptor.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
        )
        .await
        .map_err(|e| Error::Database(format!("failed to open {}: {}", descriptor.target, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_registry(dir: &tempfile::TempDir) -> TenantRegistry {
        let control = ConnectionDescriptor::sqlite(dir.path().join("directiva.sqlite3"));
        TenantRegistry::open(control, dir.path())
            .await
            .expect("registry should open")
    }

    #[tokio::test]
    async fn test_resolution_derives_storage_target() {
        let dir = tempdir().unwrap();
        let registry = open_registry(&dir).await;

        let tenant: TenantId = "ejido-norte".parse().unwrap();
        let handle = registry.resolve(&tenant).await.unwrap();

        let expected = dir.path().join("ejido-norte.sqlite3");
        assert_eq!(handle.storage_target(), expected.to_string_lossy());
        assert_eq!(handle.tenant.as_ref(), Some(&tenant));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let dir = tempdir().unwrap();
        let registry = open_registry(&dir).await;

        let tenant: TenantId = "ejido-norte".parse().unwrap();
        let first = registry.resolve(&tenant).await.unwrap();
        let second = registry.resolve(&tenant).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.open_tenants(), 1);
    }

    #[tokio::test]
    async fn test_resolved_pool_is_usable() {
        let dir = tempdir().unwrap();
        let registry = open_registry(&dir).await;

        let tenant: TenantId = "la_esperanza".parse().unwrap();
        let handle = registry.resolve(&tenant).await.unwrap();
        sqlx::query("SELECT 1").execute(&handle.pool).await.unwrap();
        assert!(dir.path().join("la_esperanza.sqlite3").exists());
    }

    #[tokio::test]
    async fn test_distinct_tenants_get_distinct_stores() {
        let dir = tempdir().unwrap();
        let registry = open_registry(&dir).await;

        let a = registry.resolve(&"norte".parse().unwrap()).await.unwrap();
        let b = registry.resolve(&"sur".parse().unwrap()).await.unwrap();

        assert_ne!(a.storage_target(), b.storage_target());
        assert_eq!(registry.open_tenants(), 2);
    }

    #[tokio::test]
    async fn test_server_engine_control_database_rejected() {
        let dir = tempdir().unwrap();
        let control = ConnectionDescriptor {
            engine: DbEngine::Postgres,
            target: "postgres://localhost/directiva".to_string(),
            max_connections: 5,
        };
        let result = TenantRegistry::open(control, dir.path()).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
