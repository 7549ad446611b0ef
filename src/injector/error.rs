//! Injector error definitions.

use thiserror::Error;

/// Errors raised while building the injector or resolving from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    /// Nothing can provide the requested type.
    #[error("No service registered for {0}")]
    MissingService(&'static str),

    /// An interface has several implementations and no alias picks one.
    #[error("Interface \"{0}\" has no implementation selected; add an injector alias")]
    UnboundInterface(String),

    /// An alias or share entry names an interface nobody registered.
    #[error("Unknown interface \"{0}\"")]
    UnknownInterface(String),

    /// An alias points at an implementation nobody registered.
    #[error("Interface \"{interface}\" has no implementation named \"{implementation}\"")]
    UnknownImplementation {
        interface: String,
        implementation: String,
    },

    /// The same interface name was registered for two different types.
    #[error("Interface \"{0}\" was registered with conflicting types")]
    InterfaceTypeMismatch(String),

    /// A `delay` entry names no request-scoped value.
    #[error("Unknown delayed dependency \"{0}\"")]
    UnknownDelayed(String),

    /// A controller depends on something nothing can provide.
    #[error("Controller \"{controller}\" depends on {dependency}, which is never registered")]
    Unsatisfied {
        controller: String,
        dependency: &'static str,
    },

    /// No controller with that name is registered.
    #[error("Controller \"{0}\" is not registered")]
    UnknownController(String),

    /// The controller exists but has no such action.
    #[error("Controller \"{class}\" has no action \"{method}\"")]
    UnknownAction { class: String, method: String },

    /// A named argument the action asked for was not supplied.
    #[error("Missing argument \"{0}\"")]
    MissingArgument(String),
}
