//! User lookup for the firewall.
//!
//! # Responsibilities
//! - Resolve a username or email to a [`User`]
//! - Re-resolve the session user on every request
//!
//! # Design Decisions
//! - Input is lower-cased before lookup and matched against both columns
//! - Refresh always goes through the username, never the numeric id, so a
//!   refreshed user is found exactly like a freshly logged-in one
//! - A missing row is an error, never an empty success

use std::sync::Arc;

use thiserror::Error;

use crate::security::store::{UserRow, UserStore};
use crate::security::user::{User, UserAccount};

/// Lookup failures, consumed by the firewall as login failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("Username \"{0}\" does not exist.")]
    NotFound(String),

    #[error("Instances of \"{0}\" are not supported.")]
    Unsupported(String),
}

/// Loads users from the `users` table.
#[derive(Clone)]
pub struct UserProvider {
    store: Arc<dyn UserStore>,
}

impl UserProvider {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Look up by username or email, case-insensitively.
    pub fn load_user_by_username(&self, username_or_email: &str) -> Result<User, UserError> {
        let needle = username_or_email.to_lowercase();

        let row = self
            .store
            .find_by_username_or_email(&needle, &needle)
            .ok_or_else(|| UserError::NotFound(username_or_email.to_string()))?;

        Ok(user_from_row(row))
    }

    /// Look up by numeric id.
    pub fn load_user_by_id(&self, id: u64) -> Option<User> {
        self.store.find_by_id(id).map(user_from_row)
    }

    /// Re-resolve an account that this provider produced earlier.
    pub fn refresh_user(&self, account: &dyn UserAccount) -> Result<User, UserError> {
        let user = account
            .as_any()
            .downcast_ref::<User>()
            .ok_or_else(|| UserError::Unsupported(account.class_name().to_string()))?;

        self.load_user_by_username(&user.username)
    }

    /// Whether accounts of the named type come from this provider.
    pub fn supports_class(&self, class: &str) -> bool {
        class == std::any::type_name::<User>()
    }
}

fn user_from_row(row: UserRow) -> User {
    User {
        id: row.id,
        roles: User::parse_roles(&row.roles),
        username: row.username,
        email: row.email,
        password: row.password,
        enabled: row.enabled,
        account_non_expired: true,
        credentials_non_expired: true,
        account_non_locked: true,
    }
}
