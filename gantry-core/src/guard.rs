// Guards: authorization predicates evaluated before a handler runs

use crate::error::Error;
use crate::provider::Instance;
use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// Contextual information for one dispatched event or RPC invocation.
///
/// The positional contract is load-bearing: the first raw argument is the
/// initiating actor (the player on client-originated events), the second is
/// the payload when the driver delivers one.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    /// Name of the event or RPC being handled.
    pub name: String,
    /// Raw arguments as delivered by the platform driver.
    pub args: Vec<Value>,
}

impl ExecutionContext {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The initiating actor, by convention the first raw argument.
    pub fn player(&self) -> Option<&Value> {
        self.args.first()
    }

    /// The main payload, by convention the second raw argument.
    pub fn payload(&self) -> Option<&Value> {
        self.args.get(1)
    }
}

/// Authorization predicate run before a guarded handler.
///
/// Guards are DI-managed singletons: declare the guard as a provider in a
/// module and register its cast with
/// [`MetadataRegistry::register_guard`](crate::MetadataRegistry::register_guard).
#[async_trait]
pub trait Guard: Any + Send + Sync {
    /// Whether this invocation may proceed.
    async fn can_activate(&self, context: &ExecutionContext) -> Result<bool, Error>;
}

/// Recovers a `dyn Guard` view from a container instance.
pub type GuardCast = fn(Instance) -> Option<Arc<dyn Guard>>;

/// The cast for a concrete guard type, stored in the metadata registry.
pub(crate) fn guard_cast_for<G: Guard>(instance: Instance) -> Option<Arc<dyn Guard>> {
    instance
        .downcast::<G>()
        .ok()
        .map(|guard| guard as Arc<dyn Guard>)
}

/// Evaluates a guard chain in declaration order, short-circuiting on the
/// first denial. Returns `Ok(true)` only if every guard allows.
pub async fn evaluate_guards(
    context: &ExecutionContext,
    guards: &[Arc<dyn Guard>],
) -> Result<bool, Error> {
    for guard in guards {
        if !guard.can_activate(context).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Allow;

    #[async_trait]
    impl Guard for Allow {
        async fn can_activate(&self, _context: &ExecutionContext) -> Result<bool, Error> {
            Ok(true)
        }
    }

    struct Deny;

    #[async_trait]
    impl Guard for Deny {
        async fn can_activate(&self, _context: &ExecutionContext) -> Result<bool, Error> {
            Ok(false)
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Guard for Counting {
        async fn can_activate(&self, _context: &ExecutionContext) -> Result<bool, Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("chat:message", vec![json!({"id": 7}), json!({"text": "hi"})])
    }

    #[test]
    fn test_context_accessors() {
        let context = ctx();
        assert_eq!(context.player().unwrap()["id"], json!(7));
        assert_eq!(context.payload().unwrap()["text"], json!("hi"));
    }

    #[tokio::test]
    async fn test_all_allow() {
        let guards: Vec<Arc<dyn Guard>> = vec![Arc::new(Allow), Arc::new(Allow)];
        assert!(evaluate_guards(&ctx(), &guards).await.unwrap());
    }

    #[tokio::test]
    async fn test_first_denial_short_circuits() {
        let count = Arc::new(AtomicUsize::new(0));
        let guards: Vec<Arc<dyn Guard>> = vec![
            Arc::new(Deny),
            Arc::new(Counting(count.clone())),
        ];
        assert!(!evaluate_guards(&ctx(), &guards).await.unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_guard_cast_recovers_trait_object() {
        let instance: Instance = Arc::new(Allow);
        assert!(guard_cast_for::<Allow>(instance.clone()).is_some());
        assert!(guard_cast_for::<Deny>(instance).is_none());
    }
}
