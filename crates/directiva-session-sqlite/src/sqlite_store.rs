//! SqliteSessionStore - SessionStore trait implementation over sqlx

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;

use directiva_core::{Error, Result};
use directiva_session::{EncodedSession, SessionPayload, SessionRecord, SessionStore};

const SCHEMA_VERSION: i32 = 1;

/// SQLite session store.
///
/// Expiry timestamps are stored as unix seconds so that the liveness
/// comparison happens inside SQLite with integer arithmetic.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) the session database at `db_path`.
    ///
    /// # Errors
    /// - `Error::Database` if the connection fails or the on-disk schema
    ///   version is unsupported
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await
            .map_err(|e| Error::Database(format!("failed to open session store: {}", e)))?;

        Self::initialize_schema(&pool).await?;

        let version: i32 = sqlx::query_scalar("SELECT version FROM schema_version")
            .fetch_one(&pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        if version != SCHEMA_VERSION {
            return Err(Error::Database(format!(
                "unsupported session schema version: {}",
                version
            )));
        }

        Ok(Self { pool })
    }

    async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?1)")
            .bind(SCHEMA_VERSION)
            .execute(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_key TEXT PRIMARY KEY,
                expire_date INTEGER NOT NULL,
                encoded_payload TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expire ON sessions(expire_date)")
            .execute(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

fn expire_from_row(unix_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix_secs, 0).unwrap_or_default()
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn save(&self, record: &SessionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_key, expire_date, encoded_payload)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_key) DO UPDATE SET
                expire_date = excluded.expire_date,
                encoded_payload = excluded.encoded_payload
            "#,
        )
        .bind(&record.session_key)
        .bind(record.expire_date.timestamp())
        .bind(record.payload.encode())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::SessionStore(format!("save failed: {}", e)))?;
        Ok(())
    }

    async fn load(&self, session_key: &str) -> Result<Option<SessionRecord>> {
        let row = sqlx::query(
            "SELECT session_key, expire_date, encoded_payload FROM sessions \
             WHERE session_key = ?1 AND expire_date > ?2",
        )
        .bind(session_key)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::SessionStore(format!("load failed: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let encoded: String = row
            .try_get("encoded_payload")
            .map_err(|e| Error::SessionStore(e.to_string()))?;
        let payload = SessionPayload::decode(&encoded)
            .map_err(|e| Error::SessionStore(format!("undecodable payload: {}", e)))?;
        let expire_secs: i64 = row
            .try_get("expire_date")
            .map_err(|e| Error::SessionStore(e.to_string()))?;

        Ok(Some(SessionRecord {
            session_key: session_key.to_string(),
            expire_date: expire_from_row(expire_secs),
            payload,
        }))
    }

    async fn delete(&self, session_key: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE session_key = ?1")
            .bind(session_key)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::SessionStore(format!("delete failed: {}", e)))?;
        Ok(())
    }

    async fn live_sessions(&self) -> Result<Vec<EncodedSession>> {
        let rows = sqlx::query(
            "SELECT session_key, expire_date, encoded_payload FROM sessions \
             WHERE expire_date > ?1",
        )
        .bind(Utc::now().timestamp())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::SessionStore(format!("scan failed: {}", e)))?;

        rows.into_iter()
            .map(|row| {
                Ok(EncodedSession {
                    session_key: row
                        .try_get("session_key")
                        .map_err(|e| Error::SessionStore(e.to_string()))?,
                    expire_date: expire_from_row(
                        row.try_get("expire_date")
                            .map_err(|e| Error::SessionStore(e.to_string()))?,
                    ),
                    encoded_payload: row
                        .try_get("encoded_payload")
                        .map_err(|e| Error::SessionStore(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn delete_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expire_date <= ?1")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::SessionStore(format!("expiry sweep failed: {}", e)))?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::SessionStore(format!("count failed: {}", e)))?;
        Ok(count as u64)
    }
}
