//! Type-keyed instances, per-request scope and the resolver view.
//!
//! # Responsibilities
//! - Hold an `Arc<T>` for any `T`, including trait objects, behind a type key
//! - Carry the values that only exist for one request
//! - Give factories and actions one lookup surface over scope and injector
//!
//! # Design Decisions
//! - The scope is owned by a single dispatch and dropped with it; nothing is
//!   ever written into the shared injector per request
//! - Lookup order is scope, then shared singletons, then interface bindings
//! - Named arguments keep the `:name` keys the resolver builds

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::injector::error::InjectError;
use crate::injector::registry::Injector;

/// Named arguments for an action, keyed `:name`.
pub type NamedArgs = BTreeMap<String, String>;

/// Key under which a route parameter is passed to an action.
pub fn arg_key(name: &str) -> String {
    format!(":{name}")
}

/// An `Arc<T>` erased behind its type key.
#[derive(Clone)]
pub struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Entry {
    /// Wrap an instance. `T` may be a trait object.
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The instance, if it was stored as `T`.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry").field("type", &self.type_name).finish()
    }
}

/// Values registered for a single request.
#[derive(Debug, Default, Clone)]
pub struct RequestScope {
    values: HashMap<TypeId, Entry>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value`, replacing any earlier value of the same type.
    pub fn insert<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.insert_entry(Entry::new(value));
    }

    pub fn insert_entry(&mut self, entry: Entry) {
        self.values.insert(entry.type_id(), entry);
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.values.get(&TypeId::of::<T>()).and_then(Entry::downcast)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Lookup surface handed to factories and actions.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    injector: &'a Injector,
    scope: &'a RequestScope,
    args: Option<&'a NamedArgs>,
}

impl<'a> Resolver<'a> {
    /// Resolver without named arguments, used for construction.
    pub fn new(injector: &'a Injector, scope: &'a RequestScope) -> Self {
        Self {
            injector,
            scope,
            args: None,
        }
    }

    /// The same resolver with named arguments attached, used for invocation.
    pub fn with_args(self, args: &'a NamedArgs) -> Self {
        Self {
            args: Some(args),
            ..self
        }
    }

    /// Resolve an instance of `T` by type.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectError> {
        if let Some(value) = self.scope.get::<T>() {
            return Ok(value);
        }
        self.injector.resolve::<T>(self)
    }

    /// A route parameter passed as named argument `:name`.
    pub fn param(&self, name: &str) -> Result<&'a str, InjectError> {
        self.args
            .and_then(|args| args.get(&arg_key(name)))
            .map(String::as_str)
            .ok_or_else(|| InjectError::MissingArgument(arg_key(name)))
    }

    /// All named arguments, empty during construction.
    pub fn args(&self) -> Option<&'a NamedArgs> {
        self.args
    }
}
