// Gantry - a NestJS-inspired module composition engine for Rust
//
// This library wires declaratively registered modules, providers, and
// controllers into a running application and binds controller methods to
// platform events and RPCs with guard authorization.

// Re-export core functionality
pub use gantry_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use gantry_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Application,
        ClassProvider,
        ConfigService,
        Container,
        Controller,
        ControllerDef,
        Dispatcher,
        Error,
        EventSource,
        ExecutionContext,
        FactoryProvider,
        Guard,
        HandlerSpec,
        MetadataRegistry,
        ModuleDescriptor,
        ModuleId,
        ParamSpec,
        PlatformDriver,
        ProviderDef,
        RpcSource,
        Scope,
        Token,
        ValueProvider,
        controller_as,
        dep,
        handler_fn,
    };
}
