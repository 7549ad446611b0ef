//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout, body limit)
//!     → security firewall (session, login, logout, access rules)
//!     → server.rs route handler (RequestContext)
//!     → dispatch (resolver chain → controller)
//!     → error.rs (failures → status + body)
//!     → Send to client
//! ```

pub mod error;
pub mod server;

pub use error::error_response;
pub use server::{AppState, HttpServer, ServerError};
