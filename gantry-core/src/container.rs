//! Instance container: the flat token-to-instance store.
//!
//! One container backs the whole application; every resolved singleton lands
//! here regardless of which module owns its provider. Written during
//! bootstrap, effectively read-only afterward.

use crate::error::Error;
use crate::provider::Instance;
use crate::token::Token;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Cloneable handle to the shared instance store.
#[derive(Clone, Default)]
pub struct Container {
    instances: Arc<RwLock<HashMap<Token, Instance>>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an instance under a token. Re-registration overrides the
    /// previous entry.
    pub fn register(&self, token: Token, instance: Instance) {
        let mut instances = self.instances.write();
        if instances.contains_key(&token) {
            warn!(token = %token, "overriding existing container entry");
        } else {
            debug!(token = %token, "registered instance");
        }
        instances.insert(token, instance);
    }

    /// Fetch the instance registered under `token`.
    pub fn resolve(&self, token: &Token) -> Result<Instance, Error> {
        trace!(token = %token, "resolving from container");
        self.instances
            .read()
            .get(token)
            .cloned()
            .ok_or_else(|| Error::NotFound(token.to_string()))
    }

    /// Fetch and downcast the instance registered under the type's own token.
    pub fn resolve_as<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        let token = Token::of::<T>();
        self.resolve(&token)?
            .downcast::<T>()
            .map_err(|_| Error::NotFound(token.to_string()))
    }

    pub fn has(&self, token: &Token) -> bool {
        self.instances.read().contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// Drop every instance. Entries are invalid after teardown.
    pub fn clear(&self) {
        let mut instances = self.instances.write();
        debug!(count = instances.len(), "clearing container");
        instances.clear();
    }
}
