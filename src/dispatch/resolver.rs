//! Controller resolver seam.
//!
//! # Responsibilities
//! - Define how a request context becomes a callable controller
//! - Run the resolve, arguments, invoke sequence for one request
//!
//! # Design Decisions
//! - Resolution is synchronous; the HTTP layer owns all awaiting
//! - A resolved controller is consumed by its single invocation

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::response::Response;

use crate::dispatch::error::DispatchError;
use crate::dispatch::request::{RequestContext, RequestInfo};
use crate::security::SecurityContext;

/// Positional inputs a standard controller receives.
#[derive(Debug, Clone)]
pub struct Arguments {
    pub params: BTreeMap<String, String>,
    pub request: Arc<RequestInfo>,
    pub security: Arc<SecurityContext>,
}

impl Arguments {
    pub fn from_context(context: &RequestContext) -> Self {
        Self {
            params: context.params.clone(),
            request: Arc::clone(&context.request),
            security: Arc::clone(&context.security),
        }
    }
}

type Invoke = Box<dyn FnOnce(Arguments) -> Result<Response, DispatchError> + Send>;

/// A controller ready to be called once.
pub struct ResolvedController {
    label: String,
    strategy: &'static str,
    invoke: Invoke,
}

impl ResolvedController {
    pub fn new<F>(label: impl Into<String>, strategy: &'static str, invoke: F) -> Self
    where
        F: FnOnce(Arguments) -> Result<Response, DispatchError> + Send + 'static,
    {
        Self {
            label: label.into(),
            strategy,
            invoke: Box::new(invoke),
        }
    }

    /// A controller that carries everything it needs and ignores arguments.
    pub fn deferred<F>(label: impl Into<String>, strategy: &'static str, invoke: F) -> Self
    where
        F: FnOnce() -> Result<Response, DispatchError> + Send + 'static,
    {
        Self::new(label, strategy, move |_| invoke())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `autowire` or `standard`.
    pub fn strategy(&self) -> &'static str {
        self.strategy
    }

    pub fn invoke(self, arguments: Arguments) -> Result<Response, DispatchError> {
        (self.invoke)(arguments)
    }
}

impl std::fmt::Debug for ResolvedController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedController")
            .field("label", &self.label)
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// Turns a request context into a controller and its arguments.
pub trait ControllerResolver: Send + Sync {
    /// `Ok(None)` when the context names no controller this resolver knows
    /// how to look for.
    fn get_controller(
        &self,
        context: &RequestContext,
    ) -> Result<Option<ResolvedController>, DispatchError>;

    fn get_arguments(
        &self,
        context: &RequestContext,
        controller: &ResolvedController,
    ) -> Result<Arguments, DispatchError>;
}

impl<R: ControllerResolver + ?Sized> ControllerResolver for Arc<R> {
    fn get_controller(
        &self,
        context: &RequestContext,
    ) -> Result<Option<ResolvedController>, DispatchError> {
        (**self).get_controller(context)
    }

    fn get_arguments(
        &self,
        context: &RequestContext,
        controller: &ResolvedController,
    ) -> Result<Arguments, DispatchError> {
        (**self).get_arguments(context, controller)
    }
}

/// Resolve, collect arguments and invoke. Returns the response and the
/// strategy that produced it.
pub fn dispatch(
    resolver: &dyn ControllerResolver,
    context: &RequestContext,
) -> Result<(Response, &'static str), DispatchError> {
    let controller = resolver
        .get_controller(context)?
        .ok_or_else(|| DispatchError::MissingController(context.route.clone()))?;

    let arguments = resolver.get_arguments(context, &controller)?;
    let strategy = controller.strategy();

    tracing::debug!(
        route = %context.route,
        controller = %controller.label(),
        strategy,
        "Dispatching"
    );

    controller.invoke(arguments).map(|response| (response, strategy))
}
