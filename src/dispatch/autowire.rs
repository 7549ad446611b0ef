//! Resolver decorator for `Class:method` targets.
//!
//! # Responsibilities
//! - Hand every non-autowired target to the wrapped resolver untouched
//! - For autowired targets, build a fresh request scope and defer
//!   construction and invocation to the injector
//!
//! # Design Decisions
//! - The target was classified when the route table was loaded
//! - Request values go into a scope owned by the deferred controller and
//!   dropped with it; the shared injector is never written to
//! - Route parameters are passed by name as `:name`

use std::sync::Arc;

use crate::dispatch::error::DispatchError;
use crate::dispatch::request::RequestContext;
use crate::dispatch::resolver::{Arguments, ControllerResolver, ResolvedController};
use crate::injector::{arg_key, InjectError, Injector, NamedArgs, RequestScope, Resolver};
use crate::routing::ControllerTarget;

/// Wraps a resolver and takes over autowired targets.
pub struct AutowireResolver<R> {
    inner: R,
    injector: Arc<Injector>,
}

impl<R: ControllerResolver> AutowireResolver<R> {
    pub fn new(inner: R, injector: Arc<Injector>) -> Self {
        Self { inner, injector }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn scope_for(&self, context: &RequestContext) -> RequestScope {
        let mut scope = RequestScope::new();

        for name in self.injector.delayed() {
            match context.attribute(name) {
                Some(entry) => scope.insert_entry(entry.clone()),
                None => tracing::debug!(
                    route = %context.route,
                    name = %name,
                    "Delayed value not available"
                ),
            }
        }
        scope.insert(Arc::clone(&context.security));

        scope
    }
}

impl<R: ControllerResolver> ControllerResolver for AutowireResolver<R> {
    fn get_controller(
        &self,
        context: &RequestContext,
    ) -> Result<Option<ResolvedController>, DispatchError> {
        let Some(ControllerTarget::Autowired { class, method }) = &context.target else {
            return self.inner.get_controller(context);
        };

        let scope = self.scope_for(context);
        let args: NamedArgs = context
            .params
            .iter()
            .map(|(name, value)| (arg_key(name), value.clone()))
            .collect();

        let injector = Arc::clone(&self.injector);
        let class = class.clone();
        let method = method.clone();
        let label = format!("{class}:{method}");

        Ok(Some(ResolvedController::deferred(label, "autowire", move || {
            let controller = injector
                .controller(&class)
                .ok_or_else(|| InjectError::UnknownController(class.clone()))?;

            controller.execute(&method, Resolver::new(&injector, &scope), &args)
        })))
    }

    fn get_arguments(
        &self,
        context: &RequestContext,
        controller: &ResolvedController,
    ) -> Result<Arguments, DispatchError> {
        self.inner.get_arguments(context, controller)
    }
}
