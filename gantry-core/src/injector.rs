//! Instantiation pipeline: constructor arguments, construction, property
//! injection.
//!
//! Each constructor parameter resolves its override token if one was given,
//! otherwise its declared token; a parameter with neither fails with a
//! named-index error. Property injections run on the still-mutable boxed
//! instance before it is frozen behind an `Arc`. Guard enforcement is not
//! woven around instances here; the dispatcher runs the guard chain
//! explicitly before invoking a handler.

use crate::controller::{Controller, ControllerDef};
use crate::error::Error;
use crate::module::ModuleId;
use crate::provider::{ClassProvider, ConstructorParam, Instance, PropertyInjection};
use crate::resolver::Resolver;
use crate::token::Token;
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

impl Resolver {
    /// Build a class provider's instance: resolve constructor args, run the
    /// construct closure, apply property injections, freeze.
    pub(crate) async fn construct_class(
        &self,
        provider: &ClassProvider,
        module: ModuleId,
        seen: &mut HashSet<Token>,
    ) -> Result<Instance, Error> {
        debug!(class = provider.class_name, module = %module, "instantiating class provider");
        let args = self
            .resolve_params(&provider.params, provider.class_name, module, seen)
            .await?;
        let mut instance = (provider.construct)(args)?;
        self.apply_properties(&provider.properties, instance.as_mut(), module, seen)
            .await?;
        Ok(Arc::from(instance))
    }

    /// Build a controller instance, keeping its `dyn Controller` view.
    pub(crate) async fn construct_controller(
        &self,
        def: &ControllerDef,
        module: ModuleId,
        seen: &mut HashSet<Token>,
    ) -> Result<Arc<dyn Controller>, Error> {
        debug!(controller = def.class_name, module = %module, "instantiating controller");
        let args = self
            .resolve_params(&def.params, def.class_name, module, seen)
            .await?;
        let mut instance = (def.construct)(args)?;
        self.apply_properties(&def.properties, instance.as_mut(), module, seen)
            .await?;
        Ok(Arc::from(instance))
    }

    async fn resolve_params(
        &self,
        params: &[ConstructorParam],
        class_name: &'static str,
        module: ModuleId,
        seen: &mut HashSet<Token>,
    ) -> Result<Vec<Instance>, Error> {
        let mut args = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            let token = param.effective().ok_or(Error::UnresolvedParameter {
                class: class_name.to_string(),
                index,
            })?;
            args.push(self.resolve(token, module, seen).await?);
        }
        Ok(args)
    }

    async fn apply_properties(
        &self,
        properties: &[PropertyInjection],
        instance: &mut (dyn Any + Send + Sync),
        module: ModuleId,
        seen: &mut HashSet<Token>,
    ) -> Result<(), Error> {
        for property in properties {
            let value = self.resolve(&property.token, module, seen).await?;
            (property.assign)(&mut *instance, value)?;
        }
        Ok(())
    }
}
