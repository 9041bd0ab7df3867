//! Module graph: the scanned import tree.
//!
//! Scanning walks the import graph depth-first from the root, wraps every
//! module exactly once, and rejects cyclic imports before anything is
//! instantiated. Diamonds are fine; a module reached over two distinct import
//! paths is wrapped on the first visit and skipped afterwards.

use crate::error::Error;
use crate::metadata::MetadataRegistry;
use crate::module::{ModuleId, ModuleWrapper};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// The scanned module graph, in deterministic scan order.
pub struct ModuleGraph {
    modules: HashMap<ModuleId, ModuleWrapper>,
    /// Scan insertion order; instantiation follows it.
    order: Vec<ModuleId>,
    globals: Vec<ModuleId>,
    root: ModuleId,
}

impl ModuleGraph {
    /// Walk the import graph from `root`, wrapping every reachable module.
    pub fn scan(registry: &MetadataRegistry, root: ModuleId) -> Result<Self, Error> {
        let mut graph = Self {
            modules: HashMap::new(),
            order: Vec::new(),
            globals: Vec::new(),
            root,
        };
        graph.visit(registry, root, &HashSet::new())?;
        graph.validate_exports()?;
        debug!(root = %root, modules = graph.order.len(), "module graph scanned");
        Ok(graph)
    }

    /// Every exported token must be owned locally or re-exported from some
    /// import chain whose hops all export it.
    fn validate_exports(&self) -> Result<(), Error> {
        for wrapper in self.iter() {
            for token in wrapper.export_tokens() {
                if wrapper.owns(token) {
                    continue;
                }
                let mut visited = HashSet::new();
                if !self.exported_through_imports(wrapper, token, &mut visited) {
                    return Err(Error::InvalidModule(format!(
                        "{} exports \"{}\" but neither declares nor re-exports it",
                        wrapper.id, token
                    )));
                }
            }
        }
        Ok(())
    }

    fn exported_through_imports(
        &self,
        wrapper: &ModuleWrapper,
        token: &crate::token::Token,
        visited: &mut HashSet<ModuleId>,
    ) -> bool {
        for import in &wrapper.imports {
            if !visited.insert(*import) {
                continue;
            }
            let Some(imported) = self.modules.get(import) else {
                continue;
            };
            if imported.exports(token)
                && (imported.owns(token)
                    || self.exported_through_imports(imported, token, visited))
            {
                return true;
            }
        }
        false
    }

    fn visit(
        &mut self,
        registry: &MetadataRegistry,
        id: ModuleId,
        path: &HashSet<ModuleId>,
    ) -> Result<(), Error> {
        // Path membership first: a diamond revisit must not mask a true cycle
        // along the current import chain.
        if path.contains(&id) {
            return Err(Error::CircularModuleDependency(id.name().to_string()));
        }
        if self.modules.contains_key(&id) {
            return Ok(());
        }

        let descriptor = registry
            .module(&id)
            .ok_or_else(|| Error::InvalidModule(id.name().to_string()))?;
        let wrapper = ModuleWrapper::from_descriptor(id, descriptor);

        let imports = wrapper.imports.clone();
        if wrapper.global {
            self.globals.push(id);
        }
        self.modules.insert(id, wrapper);
        self.order.push(id);

        let mut path = path.clone();
        path.insert(id);
        for import in imports {
            self.visit(registry, import, &path)?;
        }
        Ok(())
    }

    pub fn root(&self) -> ModuleId {
        self.root
    }

    pub fn module(&self, id: &ModuleId) -> Option<&ModuleWrapper> {
        self.modules.get(id)
    }

    /// Modules in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleWrapper> {
        self.order.iter().filter_map(|id| self.modules.get(id))
    }

    /// Global modules, resolvable from anywhere without an import.
    pub fn globals(&self) -> impl Iterator<Item = &ModuleWrapper> {
        self.globals.iter().filter_map(|id| self.modules.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// One line per module for the startup debug dump.
    pub fn tree_lines(&self) -> Vec<String> {
        self.iter()
            .map(|wrapper| {
                format!(
                    "{} (providers: {}, controllers: {}, imports: {}{})",
                    wrapper.id,
                    wrapper.provider_tokens().len(),
                    wrapper.controller_tokens().len(),
                    wrapper.imports.len(),
                    if wrapper.global { ", global" } else { "" },
                )
            })
            .collect()
    }
}

impl fmt::Debug for ModuleGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleGraph")
            .field("root", &self.root)
            .field("order", &self.order)
            .field("globals", &self.globals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleDescriptor;
    use crate::provider::ValueProvider;
    use crate::token::Token;

    struct AppModule;
    struct UsersModule;
    struct DbModule;

    fn registry_with(
        build: impl FnOnce(&mut MetadataRegistry) -> Result<(), Error>,
    ) -> MetadataRegistry {
        let mut registry = MetadataRegistry::new();
        build(&mut registry).unwrap();
        registry
    }

    #[test]
    fn test_scan_orders_depth_first() {
        let registry = registry_with(|r| {
            r.register_module::<AppModule>(
                ModuleDescriptor::new().import::<UsersModule>().import::<DbModule>(),
            )?;
            r.register_module::<UsersModule>(ModuleDescriptor::new().import::<DbModule>())?;
            r.register_module::<DbModule>(ModuleDescriptor::new())
        });

        let graph = ModuleGraph::scan(&registry, ModuleId::of::<AppModule>()).unwrap();
        let order: Vec<_> = graph.iter().map(|w| w.id).collect();
        assert_eq!(
            order,
            vec![
                ModuleId::of::<AppModule>(),
                ModuleId::of::<UsersModule>(),
                ModuleId::of::<DbModule>(),
            ]
        );
    }

    #[test]
    fn test_diamond_visited_once() {
        struct Left;
        struct Right;
        let registry = registry_with(|r| {
            r.register_module::<AppModule>(
                ModuleDescriptor::new().import::<Left>().import::<Right>(),
            )?;
            r.register_module::<Left>(ModuleDescriptor::new().import::<DbModule>())?;
            r.register_module::<Right>(ModuleDescriptor::new().import::<DbModule>())?;
            r.register_module::<DbModule>(ModuleDescriptor::new())
        });

        let graph = ModuleGraph::scan(&registry, ModuleId::of::<AppModule>()).unwrap();
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_cycle_fails_scan() {
        let registry = registry_with(|r| {
            r.register_module::<AppModule>(ModuleDescriptor::new().import::<UsersModule>())?;
            r.register_module::<UsersModule>(ModuleDescriptor::new().import::<AppModule>())
        });

        let err = ModuleGraph::scan(&registry, ModuleId::of::<AppModule>()).unwrap_err();
        assert!(matches!(err, Error::CircularModuleDependency(_)));
    }

    #[test]
    fn test_unregistered_import_is_invalid_module() {
        let registry = registry_with(|r| {
            r.register_module::<AppModule>(ModuleDescriptor::new().import::<UsersModule>())
        });

        let err = ModuleGraph::scan(&registry, ModuleId::of::<AppModule>()).unwrap_err();
        assert!(matches!(err, Error::InvalidModule(name) if name.contains("UsersModule")));
    }

    #[test]
    fn test_export_without_owner_is_invalid_module() {
        let registry = registry_with(|r| {
            r.register_module::<AppModule>(ModuleDescriptor::new().export(Token::name("ghost")))
        });

        let err = ModuleGraph::scan(&registry, ModuleId::of::<AppModule>()).unwrap_err();
        assert!(matches!(err, Error::InvalidModule(_)));
    }

    #[test]
    fn test_reexported_token_is_a_valid_export() {
        struct CoreModule;
        let registry = registry_with(|r| {
            r.register_module::<AppModule>(ModuleDescriptor::new().import::<DbModule>())?;
            // DbModule re-exports a token owned by CoreModule.
            r.register_module::<DbModule>(
                ModuleDescriptor::new()
                    .import::<CoreModule>()
                    .export(Token::name("db")),
            )?;
            r.register_module::<CoreModule>(
                ModuleDescriptor::new()
                    .provider(ValueProvider::new(Token::name("db"), 1u32))
                    .export(Token::name("db")),
            )
        });

        assert!(ModuleGraph::scan(&registry, ModuleId::of::<AppModule>()).is_ok());
    }

    #[test]
    fn test_globals_collected() {
        let registry = registry_with(|r| {
            r.register_module::<AppModule>(ModuleDescriptor::new().import::<DbModule>())?;
            r.register_module::<DbModule>(
                ModuleDescriptor::new()
                    .provider(ValueProvider::new(Token::name("db"), 1u32))
                    .export(Token::name("db"))
                    .global(),
            )
        });

        let graph = ModuleGraph::scan(&registry, ModuleId::of::<AppModule>()).unwrap();
        let globals: Vec<_> = graph.globals().map(|w| w.id).collect();
        assert_eq!(globals, vec![ModuleId::of::<DbModule>()]);
    }
}
