//! Bean-graph assembly and managed application lifetimes.
//!
//! An application is assembled from *beans*: components created from a
//! constructor function, whose parameters declare what the bean depends on.
//! Beans may also declare member operations: producers of other services,
//! injected fields, lifecycle hooks, an entry point, daemons and scheduled
//! operations.
//!
//! # Building
//!
//! Beans, constants and extensions are collected by an [`Assembly`]. Building
//! it resolves every dependency against the scopes searched by the consuming
//! bean (see [`ResolutionOrder`]), reserves one arena slot per singleton and
//! orders the operations that write those slots so that every bean is created
//! after the beans it depends on. All problems are collected and reported at
//! once by a [`BuildFailure`]: missing dependencies, dependencies more than
//! one scope could satisfy, keys provided twice in one scope and cycles
//! between singletons.
//!
//! # Lifetimes
//!
//! The built [`ApplicationImage`] is immutable and can create any number of
//! independent [`Application`]s. Each application owns a fixed-size
//! [`LifetimeArena`] and moves through the states of [`LifetimeState`]:
//!
//! - initializing writes every singleton into the arena, in dependency order;
//! - starting runs the start hooks and the entry point;
//! - running executes the daemons and scheduled operations on their own
//!   threads;
//! - stopping raises the shutdown signal, joins every task and runs the stop
//!   hooks in reverse order.
//!
//! A failure while launching discards the arena and terminates the
//! application; threads waiting for a later state are woken with the error.
//!
//! # Example
//!
//! ```
//! use bean_injector::{constant, Application, IntoSingleton, Svc};
//!
//! struct Config {
//!     greeting: String,
//! }
//!
//! struct Greeter {
//!     config: Svc<Config>,
//! }
//!
//! impl Greeter {
//!     fn new(config: Svc<Config>) -> Self {
//!         Greeter { config }
//!     }
//!
//!     fn greet(&self) -> Result<String, std::fmt::Error> {
//!         Ok(format!("{}, world!", self.config.greeting))
//!     }
//! }
//!
//! let mut assembly = Application::builder("greeter");
//! assembly.provide(constant(Config {
//!     greeting: "Hello".to_owned(),
//! }));
//! assembly.install(Greeter::new.singleton().entry_point(Greeter::greet));
//!
//! let application = assembly.build().unwrap().launch().unwrap();
//! let greeting: Svc<String> = application.entry_result().unwrap().unwrap();
//! assert_eq!("Hello, world!", greeting.as_str());
//!
//! application.stop().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value
)]

mod arena;
mod beans;
mod build;
mod config;
mod factories;
mod requests;
mod runtime;
mod services;
mod tasks;

pub use arena::*;
pub use beans::*;
pub use build::*;
pub use config::*;
pub use factories::*;
pub use requests::*;
pub use runtime::*;
pub use services::*;
pub use tasks::*;

#[cfg(test)]
mod tests;
