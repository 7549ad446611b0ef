//! Autowiring injector.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     registrations (shared, implementations, controllers, delayed)
//!     + injector section of the config (alias, share, delay)
//!     → registry.rs build() validates the graph
//!     → Injector (immutable, Arc-shared)
//!
//! Per autowired request:
//!     fresh RequestScope (delayed values + security context)
//!     → Resolver { injector, scope, args }
//!     → controller.rs: factory builds the controller, action runs
//! ```
//!
//! # Design Decisions
//! - Registrations are explicit; nothing is discovered at runtime
//! - Per-request values never touch the shared injector
//! - Missing bindings fail at startup, not on first request

pub mod controller;
pub mod error;
pub mod registry;
pub mod scope;

pub use controller::{ControllerClass, ControllerDef};
pub use error::InjectError;
pub use registry::{Dependency, Injector, InjectorBuilder};
pub use scope::{arg_key, Entry, NamedArgs, RequestScope, Resolver};
