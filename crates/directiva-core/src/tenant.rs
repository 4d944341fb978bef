//! Tenant (empresa) identity and storage-target derivation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};

/// Sentinel value meaning "no tenant selected, use the control database".
///
/// A session whose `empresa_db` key holds this value (or no value at all)
/// is served from the default connection.
pub const DEFAULT_TENANT: &str = "default";

/// File suffix for tenant-scoped SQLite stores.
const DB_SUFFIX: &str = ".sqlite3";

/// Unique identifier for a tenant (an "empresa").
///
/// Tenant identifiers are lowercase slugs: `[a-z0-9_-]`, 1 to 64
/// characters. The slug doubles as the stem of the tenant's storage
/// target, so the character set is deliberately filesystem-safe. The
/// sentinel `"default"` is rejected here; it is not a tenant, it means
/// "no tenant".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parse a tenant ID from a string slug.
    ///
    /// # Errors
    /// - `Error::InvalidTenant` if the slug is empty, too long, contains
    ///   characters outside `[a-z0-9_-]`, or is the `"default"` sentinel.
    pub fn from_string(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidTenant("empty tenant ID".to_string()));
        }
        if s.len() > 64 {
            return Err(Error::InvalidTenant(format!(
                "tenant ID too long ({} chars, max 64)",
                s.len()
            )));
        }
        if s == DEFAULT_TENANT {
            return Err(Error::InvalidTenant(
                "\"default\" is the no-tenant sentinel, not a tenant ID".to_string(),
            ));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(Error::InvalidTenant(format!(
                "invalid tenant ID format: {:?}",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the slug as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this tenant's SQLite store: `{slug}.sqlite3`
    pub fn db_file_name(&self) -> String {
        format!("{}{}", self.0, DB_SUFFIX)
    }

    /// Full storage target for this tenant under a data directory
    pub fn storage_target(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.db_file_name())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::from_string(&s)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        for slug in ["ejido-norte", "la_esperanza", "rancho3", "a"] {
            let id = TenantId::from_string(slug).unwrap();
            assert_eq!(id.as_str(), slug);
        }
    }

    #[test]
    fn test_rejects_default_sentinel() {
        assert!(TenantId::from_string("default").is_err());
    }

    #[test]
    fn test_rejects_bad_characters() {
        for slug in ["", "Ejido", "north/../etc", "with space", "acentó"] {
            assert!(
                TenantId::from_string(slug).is_err(),
                "should reject {:?}",
                slug
            );
        }
    }

    #[test]
    fn test_rejects_overlong() {
        let slug = "a".repeat(65);
        assert!(TenantId::from_string(&slug).is_err());
    }

    #[test]
    fn test_db_file_name() {
        let id = TenantId::from_string("ejido-norte").unwrap();
        assert_eq!(id.db_file_name(), "ejido-norte.sqlite3");
    }

    #[test]
    fn test_storage_target() {
        let id = TenantId::from_string("ejido-norte").unwrap();
        let target = id.storage_target(Path::new("/var/lib/directiva"));
        assert_eq!(
            target,
            PathBuf::from("/var/lib/directiva/ejido-norte.sqlite3")
        );
    }

    #[test]
    fn test_display_roundtrip() {
        let id: TenantId = "la_esperanza".parse().unwrap();
        assert_eq!(id.to_string(), "la_esperanza");
    }
}
