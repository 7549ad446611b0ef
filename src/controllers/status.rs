//! `StatusController`, resolved by the standard resolver.

use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::config::Environment;
use crate::dispatch::StandardResolver;

pub const HEALTH_ACTION: &str = "StatusController::healthAction";

pub fn register(resolver: &mut StandardResolver, environment: Environment) {
    resolver.register(HEALTH_ACTION, move |_args| {
        Ok(Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": environment.as_str(),
        }))
        .into_response())
    });
}
