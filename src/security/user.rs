//! User records handed to the security layer.

use std::any::Any;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Anything the firewall can hold as the authenticated account.
pub trait UserAccount: Any + Send + Sync {
    fn username(&self) -> &str;

    fn roles(&self) -> &BTreeSet<String>;

    /// Concrete type name, reported when a provider rejects the account.
    fn class_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// A user loaded from the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub password: String,
    pub roles: BTreeSet<String>,
    pub enabled: bool,
    pub account_non_expired: bool,
    pub credentials_non_expired: bool,
    pub account_non_locked: bool,
}

impl User {
    /// Parse a comma-delimited role column into a set.
    pub fn parse_roles(column: &str) -> BTreeSet<String> {
        column
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Copy suitable for the session: the password hash is dropped.
    pub fn without_credentials(&self) -> Self {
        Self {
            password: String::new(),
            ..self.clone()
        }
    }
}

impl UserAccount for User {
    fn username(&self) -> &str {
        &self.username
    }

    fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    fn class_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roles() {
        let roles = User::parse_roles("ADMIN, USER,,USER ");
        assert_eq!(
            roles.into_iter().collect::<Vec<_>>(),
            vec!["ADMIN".to_string(), "USER".to_string()]
        );
        assert!(User::parse_roles("").is_empty());
    }
}
