//! Controller dispatch.
//!
//! # Data Flow
//! ```text
//! Matched route (HTTP layer)
//!     → request.rs (RequestContext: target, params, request, session, security)
//!     → autowire.rs (AutowireResolver)
//!         Class:method  → fresh RequestScope → deferred injector call
//!         anything else → standard.rs (StandardResolver), unchanged
//!     → resolver.rs dispatch(): get_controller → get_arguments → invoke
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Both syntaxes coexist; the route decides, not the request
//! - Errors from either path propagate unmodified to the HTTP layer

pub mod autowire;
pub mod error;
pub mod request;
pub mod resolver;
pub mod standard;

pub use autowire::AutowireResolver;
pub use error::DispatchError;
pub use request::{RequestContext, RequestInfo};
pub use resolver::{dispatch, Arguments, ControllerResolver, ResolvedController};
pub use standard::StandardResolver;
