//! Module declarations and their scanned wrappers.
//!
//! A module is declared as a marker type plus a [`ModuleDescriptor`] registered
//! in the metadata registry. The graph scan turns each descriptor into a
//! [`ModuleWrapper`] with indexed providers and controllers.

use crate::controller::ControllerDef;
use crate::provider::ProviderDef;
use crate::token::{Token, short_type_name};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::warn;

/// Identity of a module: the `TypeId` of its marker type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId {
    id: TypeId,
    name: &'static str,
}

impl ModuleId {
    pub fn of<M: 'static>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: short_type_name::<M>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({})", self.name)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Declaration of a module: what it imports, owns, and exports.
#[derive(Default)]
pub struct ModuleDescriptor {
    pub imports: Vec<ModuleId>,
    pub providers: Vec<ProviderDef>,
    pub controllers: Vec<ControllerDef>,
    pub exports: Vec<Token>,
    pub global: bool,
}

impl ModuleDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import another module, making its exports resolvable here.
    pub fn import<M: 'static>(mut self) -> Self {
        self.imports.push(ModuleId::of::<M>());
        self
    }

    pub fn provider(mut self, provider: impl Into<ProviderDef>) -> Self {
        self.providers.push(provider.into());
        self
    }

    pub fn controller(mut self, controller: ControllerDef) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Export a locally owned token to importing modules.
    pub fn export(mut self, token: Token) -> Self {
        self.exports.push(token);
        self
    }

    /// Mark this module global: its exports are resolvable everywhere
    /// without an explicit import.
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("imports", &self.imports)
            .field("providers", &self.providers.len())
            .field("controllers", &self.controllers.len())
            .field("exports", &self.exports)
            .field("global", &self.global)
            .finish()
    }
}

/// A scanned module: the descriptor's contents indexed for resolution.
pub struct ModuleWrapper {
    pub id: ModuleId,
    pub imports: Vec<ModuleId>,
    providers: HashMap<Token, ProviderDef>,
    controllers: HashMap<Token, ControllerDef>,
    /// Declaration order, for deterministic instantiation.
    provider_order: Vec<Token>,
    controller_order: Vec<Token>,
    exports: HashSet<Token>,
    pub global: bool,
}

impl ModuleWrapper {
    pub(crate) fn from_descriptor(id: ModuleId, descriptor: &ModuleDescriptor) -> Self {
        let mut providers = HashMap::new();
        let mut provider_order = Vec::new();
        for provider in &descriptor.providers {
            let token = provider.token().clone();
            if providers.insert(token.clone(), provider.clone()).is_some() {
                // Last declaration wins, matching re-registration semantics.
                warn!(module = %id, token = %token, "provider token re-registered, overriding previous definition");
            } else {
                provider_order.push(token);
            }
        }

        let mut controllers = HashMap::new();
        let mut controller_order = Vec::new();
        for controller in &descriptor.controllers {
            let token = controller.token.clone();
            if controllers
                .insert(token.clone(), controller.clone())
                .is_some()
            {
                warn!(module = %id, token = %token, "controller re-registered, overriding previous definition");
            } else {
                controller_order.push(token);
            }
        }

        Self {
            id,
            imports: descriptor.imports.clone(),
            providers,
            controllers,
            provider_order,
            controller_order,
            exports: descriptor.exports.iter().cloned().collect(),
            global: descriptor.global,
        }
    }

    pub fn provider(&self, token: &Token) -> Option<&ProviderDef> {
        self.providers.get(token)
    }

    pub fn controller(&self, token: &Token) -> Option<&ControllerDef> {
        self.controllers.get(token)
    }

    /// Whether this module declares the token itself, as provider or
    /// controller.
    pub fn owns(&self, token: &Token) -> bool {
        self.providers.contains_key(token) || self.controllers.contains_key(token)
    }

    pub fn exports(&self, token: &Token) -> bool {
        self.exports.contains(token)
    }

    /// Provider tokens in declaration order.
    pub fn provider_tokens(&self) -> &[Token] {
        &self.provider_order
    }

    /// Controller tokens in declaration order.
    pub fn controller_tokens(&self) -> &[Token] {
        &self.controller_order
    }

    /// Exported tokens, unordered. A token may be owned locally or
    /// re-exported from an import; the graph scan validates that every
    /// export has an owner somewhere.
    pub fn export_tokens(&self) -> impl Iterator<Item = &Token> {
        self.exports.iter()
    }
}

impl fmt::Debug for ModuleWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleWrapper")
            .field("id", &self.id)
            .field("imports", &self.imports)
            .field("providers", &self.provider_order)
            .field("controllers", &self.controller_order)
            .field("global", &self.global)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ClassProvider, ValueProvider};

    struct UsersModule;
    struct DbModule;

    struct DbService;

    #[test]
    fn test_module_id_identity() {
        assert_eq!(ModuleId::of::<UsersModule>(), ModuleId::of::<UsersModule>());
        assert_ne!(ModuleId::of::<UsersModule>(), ModuleId::of::<DbModule>());
        assert_eq!(ModuleId::of::<UsersModule>().name(), "UsersModule");
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = ModuleDescriptor::new()
            .import::<DbModule>()
            .provider(ClassProvider::new::<DbService>(|_| Ok(Box::new(DbService))))
            .export(Token::of::<DbService>())
            .global();

        assert_eq!(descriptor.imports, vec![ModuleId::of::<DbModule>()]);
        assert_eq!(descriptor.providers.len(), 1);
        assert!(descriptor.global);
    }

    #[test]
    fn test_wrapper_indexes_and_exports() {
        let descriptor = ModuleDescriptor::new()
            .provider(ClassProvider::new::<DbService>(|_| Ok(Box::new(DbService))))
            .export(Token::of::<DbService>());
        let wrapper = ModuleWrapper::from_descriptor(ModuleId::of::<DbModule>(), &descriptor);

        let token = Token::of::<DbService>();
        assert!(wrapper.owns(&token));
        assert!(wrapper.exports(&token));
        assert!(!wrapper.exports(&Token::name("other")));
    }

    #[test]
    fn test_duplicate_provider_token_overrides() {
        let token = Token::name("db-url");
        let descriptor = ModuleDescriptor::new()
            .provider(ValueProvider::new(token.clone(), "first".to_string()))
            .provider(ValueProvider::new(token.clone(), "second".to_string()));
        let wrapper = ModuleWrapper::from_descriptor(ModuleId::of::<DbModule>(), &descriptor);

        assert_eq!(wrapper.provider_tokens().len(), 1);
        match wrapper.provider(&token) {
            Some(ProviderDef::Value(v)) => {
                let value = v.value.clone().downcast::<String>().unwrap();
                assert_eq!(*value, "second");
            }
            other => panic!("unexpected provider: {:?}", other),
        }
    }

}
