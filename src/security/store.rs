//! The `users` table.
//!
//! # Responsibilities
//! - Define the query surface the user provider needs
//! - Ship a table implementation seeded from a YAML fixture
//!
//! # Design Decisions
//! - Comparison is case-insensitive, like the default collation of the
//!   relational stores this replaces
//! - Rows are immutable once loaded

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading the users table.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error reading users table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in users table {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Duplicate user id {0}")]
    DuplicateId(u64),
}

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password: String,
    /// Comma-delimited role names.
    #[serde(default)]
    pub roles: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Query surface over the `users` table.
pub trait UserStore: Send + Sync {
    /// `WHERE LOWER(username) = ? OR LOWER(email) = ?`, first match. Arguments
    /// are expected already lower-cased.
    fn find_by_username_or_email(&self, username: &str, email: &str) -> Option<UserRow>;

    fn find_by_id(&self, id: u64) -> Option<UserRow>;

    fn count(&self) -> usize;
}

/// Users table held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    rows: Vec<UserRow>,
}

impl MemoryUserStore {
    pub fn from_rows(rows: Vec<UserRow>) -> Result<Self, StoreError> {
        let mut ids = std::collections::HashSet::new();
        for row in &rows {
            if !ids.insert(row.id) {
                return Err(StoreError::DuplicateId(row.id));
            }
        }
        Ok(Self { rows })
    }

    /// Load rows from a YAML list.
    pub fn from_yaml_file(path: &Path) -> Result<Self, StoreError> {
        let shown = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: shown.clone(),
            source,
        })?;
        let rows: Vec<UserRow> = serde_yaml::from_str(&content).map_err(|source| {
            StoreError::Parse {
                path: shown.clone(),
                source,
            }
        })?;

        let store = Self::from_rows(rows)?;
        tracing::info!(path = %shown, users = store.rows.len(), "Users table loaded");
        Ok(store)
    }
}

impl UserStore for MemoryUserStore {
    fn find_by_username_or_email(&self, username: &str, email: &str) -> Option<UserRow> {
        self.rows
            .iter()
            .find(|row| {
                row.username.to_lowercase() == username || row.email.to_lowercase() == email
            })
            .cloned()
    }

    fn find_by_id(&self, id: u64) -> Option<UserRow> {
        self.rows.iter().find(|row| row.id == id).cloned()
    }

    fn count(&self) -> usize {
        self.rows.len()
    }
}
