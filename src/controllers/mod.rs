//! Controllers shipped with the skeleton.
//!
//! - `HomeController` (`Class:method` routes) is built by the injector
//! - `StatusController` (`Class::method` routes) lives in the standard resolver

pub mod greeting;
pub mod home;
pub mod status;

use crate::config::Environment;
use crate::dispatch::StandardResolver;
use crate::injector::InjectorBuilder;

pub use greeting::{ConsoleGreeting, Greeting, PlainGreeting};
pub use home::HomeController;

/// Register injector-built controllers and the interfaces they use.
pub fn register_autowired(builder: &mut InjectorBuilder) {
    greeting::register(builder);
    builder.controller(home::definition());
}

/// Register controllers the standard resolver serves.
pub fn register_standard(resolver: &mut StandardResolver, environment: Environment) {
    status::register(resolver, environment);
}
