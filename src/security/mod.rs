//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     users fixture → store.rs (users table)
//!     → provider.rs (UserProvider)
//!     security section → firewall.rs (compiled firewalls, access rules)
//!
//! Per request (firewall.rs middleware):
//!     cookie → session.rs (SessionHandle)
//!     → provider.refresh_user → context.rs (SecurityContext + hierarchy.rs)
//!     → login check / logout / access rules
//!     → request extensions → dispatcher
//! ```
//!
//! # Design Decisions
//! - Users are always reloaded from the table, never trusted from the session
//! - Passwords are Argon2 PHC strings
//! - Authorization happens before any controller is built

pub mod context;
pub mod firewall;
pub mod hierarchy;
pub mod password;
pub mod provider;
pub mod session;
pub mod store;
pub mod user;

pub use context::{
    SecurityContext, AUTHENTICATION_ERROR, IS_AUTHENTICATED_ANONYMOUSLY, IS_AUTHENTICATED_FULLY,
    LAST_USERNAME, SESSION_USER,
};
pub use firewall::{firewall_middleware, AuthError, Security, SecurityError};
pub use hierarchy::RoleHierarchy;
pub use password::{hash_password, verify_password, PasswordError};
pub use provider::{UserError, UserProvider};
pub use session::{SessionHandle, SessionStore, SESSION_COOKIE};
pub use store::{MemoryUserStore, StoreError, UserRow, UserStore};
pub use user::{User, UserAccount};
