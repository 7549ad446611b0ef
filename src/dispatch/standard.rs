//! Default resolver for `Class::method` targets.

use std::collections::HashMap;
use std::sync::Arc;

use axum::response::Response;

use crate::dispatch::error::DispatchError;
use crate::dispatch::request::RequestContext;
use crate::dispatch::resolver::{Arguments, ControllerResolver, ResolvedController};

type Action = Arc<dyn Fn(Arguments) -> Result<Response, DispatchError> + Send + Sync>;

/// Looks controllers up by their full target string.
#[derive(Default, Clone)]
pub struct StandardResolver {
    actions: HashMap<String, Action>,
}

impl StandardResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the action for `target`, e.g. `StatusController::healthAction`.
    pub fn register<F>(&mut self, target: impl Into<String>, action: F) -> &mut Self
    where
        F: Fn(Arguments) -> Result<Response, DispatchError> + Send + Sync + 'static,
    {
        self.actions.insert(target.into(), Arc::new(action));
        self
    }

    pub fn contains(&self, target: &str) -> bool {
        self.actions.contains_key(target)
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

impl ControllerResolver for StandardResolver {
    fn get_controller(
        &self,
        context: &RequestContext,
    ) -> Result<Option<ResolvedController>, DispatchError> {
        let Some(target) = &context.target else {
            tracing::warn!(route = %context.route, "Route has no controller");
            return Ok(None);
        };

        let label = target.to_string();
        let action = self
            .actions
            .get(&label)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownTarget(label.clone()))?;

        Ok(Some(ResolvedController::new(label, "standard", move |args| {
            action(args)
        })))
    }

    fn get_arguments(
        &self,
        context: &RequestContext,
        _controller: &ResolvedController,
    ) -> Result<Arguments, DispatchError> {
        Ok(Arguments::from_context(context))
    }
}
