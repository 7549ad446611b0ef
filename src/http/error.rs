//! Error responses.

use axum::response::{IntoResponse, Response};

use crate::dispatch::DispatchError;

/// Turn a dispatch failure into a response. Details are only shown when
/// `debug` is set.
pub fn error_response(error: &DispatchError, debug: bool) -> Response {
    let status = error.status();
    let body = if debug {
        format!("{}: {error}", status.as_u16())
    } else {
        status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_string()
    };
    (status, body).into_response()
}
