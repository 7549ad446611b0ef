//! Web application skeleton library

pub mod config;
pub mod controllers;
pub mod dispatch;
pub mod http;
pub mod injector;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod templating;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown};
