//! User store and credential verification
//!
//! Users live in the control database. Password hashes use Argon2id in
//! PHC string format, so algorithm parameters and salt travel with the
//! hash itself.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use directiva_core::{Error, Result};

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_active: bool,
}

pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the users table if it does not exist yet.
    ///
    /// # Errors
    /// - `Error::Database` on DDL failure
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_login INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Insert a user with a freshly hashed password, returning its id.
    ///
    /// # Errors
    /// - `Error::Internal` if hashing fails
    /// - `Error::Database` on insert failure (duplicate username included)
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        is_active: bool,
    ) -> Result<i64> {
        let hash = hash_password(password)?;
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, is_active) VALUES (?1, ?2, ?3)",
        )
        .bind(username)
        .bind(hash)
        .bind(is_active as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("failed to create user: {}", e)))?;
        Ok(result.last_insert_rowid())
    }

    /// Verify a username/password pair.
    ///
    /// Returns the user on success. An unknown username, a wrong
    /// password, and an inactive account are all an indistinguishable
    /// `None`; which one it was is not leaked to the caller.
    ///
    /// # Errors
    /// - `Error::Database` on lookup failure
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, is_active FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let hash: String = row
            .try_get("password_hash")
            .map_err(|e| Error::Database(e.to_string()))?;
        if !verify_password(password, &hash) {
            return Ok(None);
        }

        let is_active: i64 = row
            .try_get("is_active")
            .map_err(|e| Error::Database(e.to_string()))?;
        if is_active == 0 {
            return Ok(None);
        }

        Ok(Some(User {
            id: row.try_get("id").map_err(|e| Error::Database(e.to_string()))?,
            username: row
                .try_get("username")
                .map_err(|e| Error::Database(e.to_string()))?,
            is_active: true,
        }))
    }

    /// Stamp the user's last login time.
    ///
    /// # Errors
    /// - `Error::Database` on update failure
    pub async fn touch_last_login(&self, user_id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = ?1 WHERE id = ?2")
            .bind(Utc::now().timestamp())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}

/// Hash a plaintext password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a plaintext password against a stored PHC hash. A malformed
/// stored hash verifies as false rather than erroring; such a row can
/// only be repaired by resetting the password anyway.
fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
