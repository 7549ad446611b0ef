//! Dependency registration table.
//!
//! # Responsibilities
//! - Collect shared singletons, interface implementations, request-scoped
//!   types and controllers at startup
//! - Apply the `injector` section of the configuration (alias, share, delay)
//! - Validate the whole graph before any request is served
//!
//! # Design Decisions
//! - Explicit registration instead of reflection: every type a controller
//!   needs is declared, so a missing binding is a startup error
//! - The built `Injector` is immutable and shared across requests
//! - Interfaces are named so configuration can alias them to an
//!   implementation; an interface with a single implementation binds to it
//!   without an alias

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::InjectorConfig;
use crate::injector::controller::ControllerClass;
use crate::injector::error::InjectError;
use crate::injector::scope::{Entry, RequestScope, Resolver};

type ErasedFactory = Arc<dyn Fn(&Resolver<'_>) -> Result<Entry, InjectError> + Send + Sync>;

// Pins the closure to the higher-ranked signature of `ErasedFactory`.
fn erase<F>(f: F) -> F
where
    F: Fn(&Resolver<'_>) -> Result<Entry, InjectError> + Send + Sync + 'static,
{
    f
}

/// A type something depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl Dependency {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

struct Interface {
    dependency: Dependency,
    implementations: BTreeMap<String, ErasedFactory>,
}

enum Binding {
    Shared(Entry),
    Factory(ErasedFactory),
}

struct InterfaceBinding {
    interface: String,
    implementation: String,
    binding: Binding,
}

/// Collects registrations; [`InjectorBuilder::build`] validates them.
#[derive(Default)]
pub struct InjectorBuilder {
    shared: HashMap<TypeId, Entry>,
    interfaces: BTreeMap<String, Interface>,
    aliases: BTreeMap<String, String>,
    request_scoped: HashMap<TypeId, &'static str>,
    delayed: HashMap<String, Dependency>,
    controllers: BTreeMap<String, Arc<dyn ControllerClass>>,
    problems: Vec<InjectError>,
}

impl InjectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a singleton, resolvable as `T`.
    pub fn share<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        let entry = Entry::new(value);
        self.shared.insert(entry.type_id(), entry);
        self
    }

    /// Register `implementation` as a candidate for the named `interface`,
    /// resolvable as `I`.
    pub fn implementation<I, F>(
        &mut self,
        interface: &str,
        implementation: &str,
        factory: F,
    ) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<I>, InjectError> + Send + Sync + 'static,
    {
        let dependency = Dependency::of::<I>();
        let erased: ErasedFactory =
            Arc::new(erase(move |resolver| factory(resolver).map(Entry::new)));

        let slot = self
            .interfaces
            .entry(interface.to_string())
            .or_insert_with(|| Interface {
                dependency,
                implementations: BTreeMap::new(),
            });

        if slot.dependency != dependency {
            self.problems
                .push(InjectError::InterfaceTypeMismatch(interface.to_string()));
            return self;
        }

        slot.implementations.insert(implementation.to_string(), erased);
        self
    }

    /// Default alias, overridable by configuration.
    pub fn alias(&mut self, interface: &str, implementation: &str) -> &mut Self {
        self.aliases
            .insert(interface.to_string(), implementation.to_string());
        self
    }

    /// Declare a type that is only ever supplied by the request scope.
    pub fn request_scoped<T: ?Sized + 'static>(&mut self) -> &mut Self {
        self.request_scoped
            .insert(TypeId::of::<T>(), std::any::type_name::<T>());
        self
    }

    /// Declare a request-scoped type that configuration may list under
    /// `injector.delay` by `name`.
    pub fn delayed<T: ?Sized + 'static>(&mut self, name: &str) -> &mut Self {
        self.request_scoped::<T>();
        self.delayed.insert(name.to_string(), Dependency::of::<T>());
        self
    }

    /// Register a controller class under its name.
    pub fn controller<C: ControllerClass + 'static>(&mut self, controller: C) -> &mut Self {
        self.controllers
            .insert(controller.name().to_string(), Arc::new(controller));
        self
    }

    /// Apply configuration, validate and freeze.
    pub fn build(self, config: &InjectorConfig) -> Result<Injector, InjectError> {
        if let Some(problem) = self.problems.into_iter().next() {
            return Err(problem);
        }

        let mut aliases = self.aliases;
        aliases.extend(config.alias.clone());

        for (interface, implementation) in &aliases {
            let slot = self
                .interfaces
                .get(interface)
                .ok_or_else(|| InjectError::UnknownInterface(interface.clone()))?;
            if !slot.implementations.contains_key(implementation) {
                return Err(InjectError::UnknownImplementation {
                    interface: interface.clone(),
                    implementation: implementation.clone(),
                });
            }
        }

        for name in &config.share {
            if !self.interfaces.contains_key(name) {
                return Err(InjectError::UnknownInterface(name.clone()));
            }
        }

        for name in &config.delay {
            if !self.delayed.contains_key(name) {
                return Err(InjectError::UnknownDelayed(name.clone()));
            }
        }

        let mut interfaces = HashMap::new();
        for (name, mut slot) in self.interfaces {
            let chosen = match aliases.get(&name) {
                Some(implementation) => implementation.clone(),
                None if slot.implementations.len() == 1 => {
                    slot.implementations.keys().next().cloned().unwrap_or_default()
                }
                None => return Err(InjectError::UnboundInterface(name)),
            };

            let factory = slot
                .implementations
                .remove(&chosen)
                .ok_or_else(|| InjectError::UnknownImplementation {
                    interface: name.clone(),
                    implementation: chosen.clone(),
                })?;

            interfaces.insert(
                slot.dependency.type_id,
                InterfaceBinding {
                    interface: name,
                    implementation: chosen,
                    binding: Binding::Factory(factory),
                },
            );
        }

        let mut injector = Injector {
            shared: self.shared,
            interfaces,
            request_scoped: self.request_scoped,
            controllers: self.controllers,
            delayed: config.delay.clone(),
        };

        for controller in injector.controllers.values() {
            for dependency in controller.requires() {
                if !injector.can_provide(dependency.type_id) {
                    return Err(InjectError::Unsatisfied {
                        controller: controller.name().to_string(),
                        dependency: dependency.type_name,
                    });
                }
            }
        }

        for name in &config.share {
            injector.share_interface(name)?;
        }

        tracing::debug!(
            shared = injector.shared.len(),
            interfaces = injector.interfaces.len(),
            controllers = injector.controllers.len(),
            delayed = ?injector.delayed,
            "Injector built"
        );

        Ok(injector)
    }
}

/// The frozen registration table.
pub struct Injector {
    shared: HashMap<TypeId, Entry>,
    interfaces: HashMap<TypeId, InterfaceBinding>,
    request_scoped: HashMap<TypeId, &'static str>,
    controllers: BTreeMap<String, Arc<dyn ControllerClass>>,
    delayed: Vec<String>,
}

impl Injector {
    /// An injector with no registrations.
    pub fn empty() -> Self {
        Self {
            shared: HashMap::new(),
            interfaces: HashMap::new(),
            request_scoped: HashMap::new(),
            controllers: BTreeMap::new(),
            delayed: Vec::new(),
        }
    }

    /// Resolve `T` from shared singletons or interface bindings. Request
    /// scoped values are looked up by [`Resolver::get`] before this.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
        resolver: &Resolver<'_>,
    ) -> Result<Arc<T>, InjectError> {
        let type_id = TypeId::of::<T>();
        let missing = || InjectError::MissingService(std::any::type_name::<T>());

        if let Some(entry) = self.shared.get(&type_id) {
            return entry.downcast::<T>().ok_or_else(missing);
        }

        match self.interfaces.get(&type_id).map(|b| &b.binding) {
            Some(Binding::Shared(entry)) => entry.downcast::<T>().ok_or_else(missing),
            Some(Binding::Factory(factory)) => {
                factory(resolver)?.downcast::<T>().ok_or_else(missing)
            }
            None => Err(missing()),
        }
    }

    /// Controller class by registry name.
    pub fn controller(&self, name: &str) -> Option<&Arc<dyn ControllerClass>> {
        self.controllers.get(name)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &Arc<dyn ControllerClass>> {
        self.controllers.values()
    }

    /// Names listed under `injector.delay`, in configuration order.
    pub fn delayed(&self) -> &[String] {
        &self.delayed
    }

    /// `(interface, implementation)` pairs currently bound.
    pub fn bindings(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .interfaces
            .values()
            .map(|b| (b.interface.as_str(), b.implementation.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    fn can_provide(&self, type_id: TypeId) -> bool {
        self.shared.contains_key(&type_id)
            || self.interfaces.contains_key(&type_id)
            || self.request_scoped.contains_key(&type_id)
    }

    fn share_interface(&mut self, name: &str) -> Result<(), InjectError> {
        let Some(type_id) = self
            .interfaces
            .iter()
            .find(|(_, b)| b.interface == name)
            .map(|(id, _)| *id)
        else {
            return Err(InjectError::UnknownInterface(name.to_string()));
        };

        let factory = match self.interfaces.get(&type_id).map(|b| &b.binding) {
            Some(Binding::Factory(factory)) => Arc::clone(factory),
            _ => return Ok(()),
        };

        let scope = RequestScope::new();
        let entry = factory(&Resolver::new(self, &scope))?;

        if let Some(binding) = self.interfaces.get_mut(&type_id) {
            binding.binding = Binding::Shared(entry);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("shared", &self.shared.len())
            .field("bindings", &self.bindings())
            .field("controllers", &self.controllers.keys().collect::<Vec<_>>())
            .field("delayed", &self.delayed)
            .finish()
    }
}
