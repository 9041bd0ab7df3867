// Core library for the Gantry module composition engine
// Module graph scanning, dependency resolution, and event/RPC binding

pub mod application;
pub mod binder;
pub mod config;
pub mod container;
pub mod controller;
pub mod driver;
pub mod error;
pub mod flow;
pub mod graph;
pub mod guard;
pub mod injector;
pub mod logging;
pub mod metadata;
pub mod module;
pub mod provider;
pub mod resolver;
pub mod token;

// Re-export commonly used types
pub use application::*;
pub use config::*;
pub use container::*;
pub use controller::*;
pub use driver::*;
pub use error::*;
pub use flow::*;
pub use graph::*;
pub use guard::*;
pub use metadata::*;
pub use module::*;
pub use provider::*;
pub use resolver::*;
pub use token::*;
