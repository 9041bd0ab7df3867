//! Dependency resolver: token to instance, honoring module visibility.
//!
//! Resolution order per token: instance container short-circuit (memoization
//! is application-wide, not per-module), circular-token check, then the owner
//! search: the context module's own declarations, then transitively any
//! imported module that exports the token, then global modules. The located
//! provider is realized by kind; singletons are cached, transients never are.

use crate::container::Container;
use crate::controller::Controller;
use crate::error::Error;
use crate::graph::ModuleGraph;
use crate::metadata::{MetadataRegistry, Scope};
use crate::module::{ModuleId, ModuleWrapper};
use crate::provider::{Instance, ProviderDef};
use crate::token::Token;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// Resolves tokens against the scanned module graph into the shared
/// container.
pub struct Resolver {
    registry: Arc<MetadataRegistry>,
    graph: Arc<ModuleGraph>,
    container: Container,
    /// Controllers keep a `dyn Controller` view alongside their container
    /// entry so the binder and lifecycle hooks can reach them.
    controllers: Mutex<HashMap<Token, Arc<dyn Controller>>>,
}

impl Resolver {
    pub fn new(registry: Arc<MetadataRegistry>, graph: Arc<ModuleGraph>, container: Container) -> Self {
        Self {
            registry,
            graph,
            container,
            controllers: Mutex::new(HashMap::new()),
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    pub(crate) fn registry_handle(&self) -> Arc<MetadataRegistry> {
        self.registry.clone()
    }

    /// The `dyn Controller` view of a resolved controller.
    pub fn controller(&self, token: &Token) -> Option<Arc<dyn Controller>> {
        self.controllers.lock().get(token).cloned()
    }

    /// Resolve `token` as seen from `context`. `seen` tracks the ancestors of
    /// the in-flight resolution for circular-token detection; a token leaves
    /// the set once its branch completes, so siblings depending on the same
    /// uncached (transient) token are not a cycle.
    pub fn resolve<'a>(
        &'a self,
        token: &'a Token,
        context: ModuleId,
        seen: &'a mut HashSet<Token>,
    ) -> BoxFuture<'a, Result<Instance, Error>> {
        Box::pin(async move {
            if self.container.has(token) {
                return self.container.resolve(token);
            }
            if !seen.insert(token.clone()) {
                return Err(Error::CircularTokenDependency(token.to_string()));
            }
            let result = self.resolve_uncached(token, context, seen).await;
            seen.remove(token);
            result
        })
    }

    async fn resolve_uncached(
        &self,
        token: &Token,
        context: ModuleId,
        seen: &mut HashSet<Token>,
    ) -> Result<Instance, Error> {
        trace!(token = %token, module = %context, "resolving token");

        let owner = self.find_owner(context, token).ok_or_else(|| {
            Error::UnresolvedToken {
                token: token.to_string(),
                module: context.name().to_string(),
            }
        })?;
        let wrapper = self
            .graph
            .module(&owner)
            .ok_or_else(|| Error::Internal(format!("module {} missing from graph", owner)))?;

        if let Some(provider) = wrapper.provider(token) {
            return self.realize(provider, owner, seen).await;
        }
        if let Some(def) = wrapper.controller(token) {
            let controller = self.construct_controller(def, owner, seen).await?;
            self.controllers
                .lock()
                .insert(token.clone(), controller.clone());
            let instance: Instance = controller;
            self.container.register(token.clone(), instance.clone());
            return Ok(instance);
        }
        Err(Error::Internal(format!(
            "module {} claims token \"{}\" but defines no provider for it",
            owner, token
        )))
    }

    async fn realize(
        &self,
        provider: &ProviderDef,
        owner: ModuleId,
        seen: &mut HashSet<Token>,
    ) -> Result<Instance, Error> {
        match provider {
            ProviderDef::Value(value) => {
                // Literal values are cached regardless of declared scope.
                self.container
                    .register(value.provide.clone(), value.value.clone());
                Ok(value.value.clone())
            }
            ProviderDef::Factory(factory) => {
                let mut deps = Vec::with_capacity(factory.inject.len());
                for inject in &factory.inject {
                    match self.resolve(&inject.token, owner, seen).await {
                        Ok(instance) => deps.push(Some(instance)),
                        Err(err) if inject.optional => {
                            debug!(
                                token = %inject.token,
                                error = %err,
                                "optional factory dependency unresolved, substituting none"
                            );
                            deps.push(None);
                        }
                        Err(err) => return Err(err),
                    }
                }
                let instance = (factory.factory)(deps).await?;
                if self.scope_for(&factory.provide, factory.scope) == Scope::Singleton {
                    self.container
                        .register(factory.provide.clone(), instance.clone());
                }
                Ok(instance)
            }
            ProviderDef::Class(class) => {
                let instance = self.construct_class(class, owner, seen).await?;
                if self.scope_for(&class.provide, class.scope) == Scope::Singleton {
                    self.container
                        .register(class.provide.clone(), instance.clone());
                }
                Ok(instance)
            }
        }
    }

    /// Provider scope: an explicit scope on the definition wins, then
    /// registry metadata, then the singleton default.
    fn scope_for(&self, token: &Token, declared: Option<Scope>) -> Scope {
        declared
            .or_else(|| self.registry.scope_of(token))
            .unwrap_or_default()
    }

    /// Visibility search: context's own declarations, then exported tokens
    /// through the import graph, then global modules.
    fn find_owner(&self, context: ModuleId, token: &Token) -> Option<ModuleId> {
        let wrapper = self.graph.module(&context)?;
        if wrapper.owns(token) {
            return Some(context);
        }
        let mut visited = HashSet::new();
        if let Some(owner) = self.find_in_imports(wrapper, token, &mut visited) {
            return Some(owner);
        }
        self.graph
            .globals()
            .find(|module| module.exports(token) && module.owns(token))
            .map(|module| module.id)
    }

    /// Search the import graph for a module that exports and owns the token.
    /// The export gate applies at every hop: a non-exported provider is
    /// invisible even when the defining module is transitively imported.
    fn find_in_imports(
        &self,
        wrapper: &ModuleWrapper,
        token: &Token,
        visited: &mut HashSet<ModuleId>,
    ) -> Option<ModuleId> {
        for import in &wrapper.imports {
            if !visited.insert(*import) {
                continue;
            }
            let Some(imported) = self.graph.module(import) else {
                continue;
            };
            if imported.exports(token) {
                if imported.owns(token) {
                    return Some(imported.id);
                }
                // Re-export: the owner sits deeper behind this module.
                if let Some(owner) = self.find_in_imports(imported, token, visited) {
                    return Some(owner);
                }
            }
        }
        None
    }
}
