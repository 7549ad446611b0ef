//! Controller classes registered with the injector.
//!
//! A controller is a factory that builds an instance from the resolver plus a
//! table of named actions. `ControllerDef` keeps the concrete type; the
//! injector only sees the type-erased [`ControllerClass`].

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::response::Response;

use crate::dispatch::DispatchError;
use crate::injector::error::InjectError;
use crate::injector::registry::Dependency;
use crate::injector::scope::{NamedArgs, Resolver};

type Factory<C> = Arc<dyn Fn(&Resolver<'_>) -> Result<C, InjectError> + Send + Sync>;
type Action<C> = Arc<dyn Fn(&C, &Resolver<'_>) -> Result<Response, DispatchError> + Send + Sync>;

/// Type-erased controller, as stored by the injector.
pub trait ControllerClass: Send + Sync {
    /// Registry name, the `Class` part of `Class:method`.
    fn name(&self) -> &str;

    /// Types the factory and actions resolve.
    fn requires(&self) -> &[Dependency];

    /// Action names, sorted.
    fn actions(&self) -> Vec<&str>;

    fn has_action(&self, action: &str) -> bool;

    /// Build an instance, then run `action` on it with `args`.
    fn execute(
        &self,
        action: &str,
        resolver: Resolver<'_>,
        args: &NamedArgs,
    ) -> Result<Response, DispatchError>;
}

/// Builder for a controller with instance type `C`.
pub struct ControllerDef<C> {
    name: String,
    requires: Vec<Dependency>,
    factory: Factory<C>,
    actions: BTreeMap<String, Action<C>>,
}

impl<C: Send + Sync + 'static> ControllerDef<C> {
    /// Start a controller definition with the factory that constructs it.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Resolver<'_>) -> Result<C, InjectError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            requires: Vec::new(),
            factory: Arc::new(factory),
            actions: BTreeMap::new(),
        }
    }

    /// Declare a dependency so it is checked before the server starts.
    pub fn requires<T: ?Sized + Send + Sync + 'static>(mut self) -> Self {
        let dependency = Dependency::of::<T>();
        if !self.requires.contains(&dependency) {
            self.requires.push(dependency);
        }
        self
    }

    /// Add a named action.
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&C, &Resolver<'_>) -> Result<Response, DispatchError> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }
}

impl<C: Send + Sync + 'static> ControllerClass for ControllerDef<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> &[Dependency] {
        &self.requires
    }

    fn actions(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    fn execute(
        &self,
        action: &str,
        resolver: Resolver<'_>,
        args: &NamedArgs,
    ) -> Result<Response, DispatchError> {
        let instance = (self.factory)(&resolver)?;

        let run = self.actions.get(action).ok_or_else(|| InjectError::UnknownAction {
            class: self.name.clone(),
            method: action.to_string(),
        })?;

        run(&instance, &resolver.with_args(args))
    }
}
