//! The authenticated identity of one request.

use std::collections::BTreeSet;

use crate::security::hierarchy::RoleHierarchy;
use crate::security::user::User;

/// Granted to any request with a logged-in user.
pub const IS_AUTHENTICATED_FULLY: &str = "IS_AUTHENTICATED_FULLY";

/// Granted to every request, logged in or not.
pub const IS_AUTHENTICATED_ANONYMOUSLY: &str = "IS_AUTHENTICATED_ANONYMOUSLY";

/// Session key holding the last login failure message.
pub const AUTHENTICATION_ERROR: &str = "_security.last_error";

/// Session key holding the username of the last login attempt.
pub const LAST_USERNAME: &str = "_security.last_username";

/// Session key holding the logged-in user, as JSON.
pub const SESSION_USER: &str = "_security.user";

/// Current user plus the roles it reaches through the hierarchy.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    user: Option<User>,
    roles: BTreeSet<String>,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User, hierarchy: &RoleHierarchy) -> Self {
        let roles = hierarchy.reachable_roles(&user.roles);
        Self {
            user: Some(user),
            roles,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Roles held directly or through the hierarchy.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Whether the current identity holds `attribute`.
    pub fn is_granted(&self, attribute: &str) -> bool {
        match attribute {
            IS_AUTHENTICATED_ANONYMOUSLY => true,
            IS_AUTHENTICATED_FULLY => self.is_authenticated(),
            role => self.roles.contains(role),
        }
    }
}
