//! Dispatch error definitions.

use axum::http::StatusCode;
use thiserror::Error;

use crate::injector::InjectError;
use crate::routing::UrlError;
use crate::templating::TemplateError;

/// Errors raised while resolving or running a controller.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The matched route carries no controller.
    #[error("Unable to look for the controller of route \"{0}\"")]
    MissingController(String),

    /// The standard resolver does not know the target.
    #[error("Unable to find the controller \"{0}\"")]
    UnknownTarget(String),

    /// Construction or invocation through the injector failed.
    #[error(transparent)]
    Inject(#[from] InjectError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Url(#[from] UrlError),

    /// An action reported a failure of its own.
    #[error("{0}")]
    Action(String),
}

impl DispatchError {
    /// HTTP status the error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::MissingController(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
