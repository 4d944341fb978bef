//! Connection descriptors

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Database engine backing a datastore.
///
/// Tenant stores are always SQLite with a derived file path. The
/// server engines exist for deployment profiles that point the control
/// database elsewhere; this build only opens SQLite targets and rejects
/// the others at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbEngine {
    #[default]
    Sqlite,
    Postgres,
    MySql,
}

/// Where a datastore lives and how to connect to it.
///
/// For SQLite the target is a file path; for the server engines it is a
/// full connection URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    #[serde(default)]
    pub engine: DbEngine,

    /// File path (sqlite) or connection URL (postgres, mysql)
    pub target: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl ConnectionDescriptor {
    /// Descriptor for a SQLite file store.
    pub fn sqlite(path: impl AsRef<Path>) -> Self {
        Self {
            engine: DbEngine::Sqlite,
            target: path.as_ref().to_string_lossy().into_owned(),
            max_connections: default_max_connections(),
        }
    }

    /// The target as a filesystem path (SQLite only).
    pub fn file_path(&self) -> Option<PathBuf> {
        match self.engine {
            DbEngine::Sqlite => Some(PathBuf::from(&self.target)),
            _ => None,
        }
    }
}
