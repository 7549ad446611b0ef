//! The `Greeting` interface and its implementations.
//!
//! `HomeController:indexAction` asks for `dyn Greeting`; which implementation
//! it gets is decided by `injector.alias` in `global.yml`.

use std::sync::Arc;

use crate::injector::InjectorBuilder;

pub trait Greeting: Send + Sync {
    fn message(&self) -> String;
}

/// Explains the alias that selected it.
#[derive(Debug, Default)]
pub struct ConsoleGreeting;

impl Greeting for ConsoleGreeting {
    fn message(&self) -> String {
        "Even though Greeting was requested by HomeController:indexAction, ConsoleGreeting \
         was resolved. Map interfaces to implementations under injector.alias in global.yml."
            .to_string()
    }
}

#[derive(Debug, Default)]
pub struct PlainGreeting;

impl Greeting for PlainGreeting {
    fn message(&self) -> String {
        "Hello from app-skeleton.".to_string()
    }
}

/// Register both implementations under the `Greeting` interface.
pub fn register(builder: &mut InjectorBuilder) {
    builder
        .implementation::<dyn Greeting, _>("Greeting", "ConsoleGreeting", |_| {
            Ok(Arc::new(ConsoleGreeting))
        })
        .implementation::<dyn Greeting, _>("Greeting", "PlainGreeting", |_| {
            Ok(Arc::new(PlainGreeting))
        });
}
