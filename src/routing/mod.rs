//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     routes.yml
//!     → table.rs (descriptors, methods, duplicate checks)
//!     → target.rs (classify each _controller once)
//!     → Freeze as immutable RouteTable
//!     → registered on the axum Router by the HTTP server
//!
//! URL generation:
//!     route name + params → url.rs → path
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Path matching itself is delegated to axum
//! - The resolver strategy is decided per route, not per request

pub mod table;
pub mod target;
pub mod url;

pub use table::{parse_methods, pattern_params, RouteDescriptor, RouteError, RouteTable};
pub use target::{is_autowire, ControllerTarget};
pub use url::{UrlError, UrlGenerator};
