//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config/global.yml          (selects the environment)
//!     + config/<env>.yml      (optional)
//!     + config/security.yml
//!     + config/routes.yml
//!     → loader.rs (parse, shallow merge, deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → read once by the application bootstrap
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - An unknown environment is fatal at startup
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, Environment, FirewallConfig, FormLoginConfig, InjectorConfig, LogoutConfig,
    ObservabilityConfig, RouteConfig, RouteDefaults, SecurityConfig,
};
pub use validation::ValidationError;
