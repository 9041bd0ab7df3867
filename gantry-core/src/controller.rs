// Controllers: event/RPC handler hosts with lifecycle hooks

use crate::error::Error;
use crate::provider::{ConstructorParam, Instance, PropertyInjection};
use crate::token::{Token, short_type_name};
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A class hosting event/RPC handlers, instantiated through the DI pipeline.
///
/// The lifecycle hooks default to no-ops; override the ones you need. Hooks
/// are awaited in declaration order during the matching application phase.
#[async_trait]
pub trait Controller: Any + Send + Sync {
    /// Called after the application finished instantiating all modules.
    async fn on_init(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Called after all handlers were bound to the platform driver.
    async fn on_started(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Called when the application is shutting down, with the triggering
    /// signal if one was given.
    async fn on_shutdown(&self, _signal: Option<&str>) -> Result<(), Error> {
        Ok(())
    }
}

/// Downcasts a shared controller to its concrete type.
pub fn controller_as<T: Controller>(controller: &Arc<dyn Controller>) -> Option<Arc<T>> {
    let any: Arc<dyn Any + Send + Sync> = controller.clone();
    any.downcast::<T>().ok()
}

/// Builds a controller instance from resolved constructor arguments.
pub type ControllerConstructFn =
    Arc<dyn Fn(Vec<Instance>) -> Result<Box<dyn Controller>, Error> + Send + Sync>;

/// Declaration of a controller: its token, constructor dependencies, and
/// property injections. Handler and guard metadata is recorded against the
/// controller's token in the metadata registry.
#[derive(Clone)]
pub struct ControllerDef {
    pub token: Token,
    pub class_name: &'static str,
    pub params: Vec<ConstructorParam>,
    pub properties: Vec<PropertyInjection>,
    pub construct: ControllerConstructFn,
}

impl ControllerDef {
    pub fn new<T: Controller>(
        construct: impl Fn(Vec<Instance>) -> Result<Box<dyn Controller>, Error>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            token: Token::of::<T>(),
            class_name: short_type_name::<T>(),
            params: Vec::new(),
            properties: Vec::new(),
            construct: Arc::new(construct),
        }
    }

    /// Declare the next constructor parameter's dependency token.
    pub fn param(mut self, token: Token) -> Self {
        self.params.push(ConstructorParam {
            declared: Some(token),
            overridden: None,
        });
        self
    }

    /// Declare a constructor parameter with no resolvable token.
    pub fn param_untyped(mut self) -> Self {
        self.params.push(ConstructorParam {
            declared: None,
            overridden: None,
        });
        self
    }

    /// Override the token for the parameter at `index`.
    pub fn inject_at(mut self, index: usize, token: Token) -> Self {
        while self.params.len() <= index {
            self.params.push(ConstructorParam {
                declared: None,
                overridden: None,
            });
        }
        self.params[index].overridden = Some(token);
        self
    }

    /// Declare a property injection applied after construction.
    pub fn property(
        mut self,
        name: &'static str,
        token: Token,
        assign: impl Fn(&mut dyn Any, Instance) -> Result<(), Error> + Send + Sync + 'static,
    ) -> Self {
        self.properties.push(PropertyInjection {
            name,
            token,
            assign: Arc::new(assign),
        });
        self
    }
}

impl fmt::Debug for ControllerDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDef")
            .field("token", &self.token)
            .field("class_name", &self.class_name)
            .field("params", &self.params)
            .finish()
    }
}
