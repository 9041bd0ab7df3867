//! Metadata registry: the explicit-registration side-table.
//!
//! Where the original decorator front-end would record module, handler,
//! parameter, and guard declarations through reflection, Gantry applications
//! register the same metadata directly against a [`MetadataRegistry`] before
//! bootstrap. The engine only ever reads this store.
//!
//! Declarations are keyed the way the decorators were: module descriptors by
//! module id, handler specs by controller token, parameter specs and method
//! guards by (controller token, method name).

use crate::controller::Controller;
use crate::error::Error;
use crate::guard::{Guard, GuardCast, guard_cast_for};
use crate::module::{ModuleDescriptor, ModuleId};
use crate::token::Token;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Lifetime of a provider's instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Scope {
    /// One shared instance, created on first resolution and reused.
    #[default]
    Singleton,
    /// A fresh instance per resolution; never cached.
    Transient,
}

/// How one handler parameter is extracted from the raw dispatch arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// The initiating actor (first raw argument).
    Player,
    /// The payload (second raw argument, or the flattened tail).
    Payload,
    /// A keyed property of the payload.
    Param,
    /// A user-defined kind; the flow handler rejects kinds it does not know.
    Custom(&'static str),
}

/// Declaration of one handler parameter, recorded per method.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    /// Position in the handler method's signature.
    pub index: usize,
    pub kind: ParamKind,
    /// Property key, where the kind supports one.
    pub key: Option<String>,
}

impl ParamSpec {
    pub fn player(index: usize) -> Self {
        Self {
            index,
            kind: ParamKind::Player,
            key: None,
        }
    }

    /// A single property of the actor object.
    pub fn player_key(index: usize, key: impl Into<String>) -> Self {
        Self {
            index,
            kind: ParamKind::Player,
            key: Some(key.into()),
        }
    }

    pub fn payload(index: usize) -> Self {
        Self {
            index,
            kind: ParamKind::Payload,
            key: None,
        }
    }

    /// A single property of the payload object.
    pub fn payload_key(index: usize, key: impl Into<String>) -> Self {
        Self {
            index,
            kind: ParamKind::Payload,
            key: Some(key.into()),
        }
    }

    /// A keyed payload property with positional fallback; the key is
    /// mandatory for this kind.
    pub fn param(index: usize, key: impl Into<String>) -> Self {
        Self {
            index,
            kind: ParamKind::Param,
            key: Some(key.into()),
        }
    }

    pub fn custom(index: usize, tag: &'static str) -> Self {
        Self {
            index,
            kind: ParamKind::Custom(tag),
            key: None,
        }
    }
}

/// Which driver channel an event handler listens on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventSource {
    /// Any event, client- or server-originated.
    Any,
    /// Client-originated events only.
    Client,
    /// Server-originated events only.
    Server,
}

/// Which side a remote procedure call originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpcSource {
    Client,
    Server,
}

/// The binding kind of a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerKind {
    Event(EventSource),
    Rpc(RpcSource),
}

/// Invokes a handler method on a controller instance with resolved arguments.
/// Event handlers conventionally return `Value::Null`; RPC handlers return
/// their reply.
pub type HandlerFn = Arc<
    dyn Fn(Arc<dyn Controller>, Vec<Value>) -> BoxFuture<'static, Result<Value, Error>>
        + Send
        + Sync,
>;

/// Wraps an async closure into a [`HandlerFn`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Arc<dyn Controller>, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, Error>> + Send + 'static,
{
    Arc::new(move |controller, args| Box::pin(f(controller, args)))
}

/// A controller method bound to a runtime event or RPC.
///
/// `params` is left empty at declaration time; the binder attaches the
/// parameter specs recorded against (controller token, method) when it builds
/// the dispatcher.
#[derive(Clone)]
pub struct HandlerSpec {
    pub kind: HandlerKind,
    /// Event or RPC name matched against the driver.
    pub name: String,
    /// Handler method name, used as the parameter-spec key and in logs.
    pub method: &'static str,
    pub params: Vec<ParamSpec>,
    /// Method-level guard tokens, in declaration order.
    pub guards: Vec<Token>,
    /// WebView instance this handler targets. When set, the binder registers
    /// the dispatcher through `PlatformDriver::on_webview` with this id
    /// instead of the kind's channel.
    pub webview: Option<String>,
    pub callback: HandlerFn,
}

impl HandlerSpec {
    fn new(kind: HandlerKind, name: impl Into<String>, method: &'static str, callback: HandlerFn) -> Self {
        Self {
            kind,
            name: name.into(),
            method,
            params: Vec::new(),
            guards: Vec::new(),
            webview: None,
            callback,
        }
    }

    /// Handler for any event, regardless of origin.
    pub fn on(name: impl Into<String>, method: &'static str, callback: HandlerFn) -> Self {
        Self::new(HandlerKind::Event(EventSource::Any), name, method, callback)
    }

    /// Handler for client-originated events.
    pub fn on_client(name: impl Into<String>, method: &'static str, callback: HandlerFn) -> Self {
        Self::new(HandlerKind::Event(EventSource::Client), name, method, callback)
    }

    /// Handler for server-originated events.
    pub fn on_server(name: impl Into<String>, method: &'static str, callback: HandlerFn) -> Self {
        Self::new(HandlerKind::Event(EventSource::Server), name, method, callback)
    }

    /// Handler for RPCs invoked by clients.
    pub fn rpc_client(name: impl Into<String>, method: &'static str, callback: HandlerFn) -> Self {
        Self::new(HandlerKind::Rpc(RpcSource::Client), name, method, callback)
    }

    /// Handler for RPCs invoked by the server.
    pub fn rpc_server(name: impl Into<String>, method: &'static str, callback: HandlerFn) -> Self {
        Self::new(HandlerKind::Rpc(RpcSource::Server), name, method, callback)
    }

    /// Append a method-level guard token.
    pub fn guard(mut self, token: Token) -> Self {
        self.guards.push(token);
        self
    }

    /// Target a specific WebView instance.
    pub fn webview(mut self, id: impl Into<String>) -> Self {
        self.webview = Some(id.into());
        self
    }
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSpec")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("guards", &self.guards)
            .field("webview", &self.webview)
            .finish()
    }
}

/// Side-table of every declaration the engine consumes.
#[derive(Default)]
pub struct MetadataRegistry {
    modules: HashMap<ModuleId, ModuleDescriptor>,
    handlers: HashMap<Token, Vec<HandlerSpec>>,
    params: HashMap<(Token, &'static str), Vec<ParamSpec>>,
    class_guards: HashMap<Token, Vec<Token>>,
    method_guards: HashMap<(Token, &'static str), Vec<Token>>,
    scopes: HashMap<Token, Scope>,
    guard_casts: HashMap<Token, GuardCast>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a module descriptor under a marker type. Registering the same
    /// module twice is a duplicate declaration.
    pub fn register_module<M: 'static>(
        &mut self,
        descriptor: ModuleDescriptor,
    ) -> Result<(), Error> {
        let id = ModuleId::of::<M>();
        if self.modules.contains_key(&id) {
            return Err(Error::DuplicateAnnotation(format!(
                "module {} is already registered",
                id.name()
            )));
        }
        self.modules.insert(id, descriptor);
        Ok(())
    }

    pub fn module(&self, id: &ModuleId) -> Option<&ModuleDescriptor> {
        self.modules.get(id)
    }

    /// Record an injectable's scope. Re-declaring a class is a duplicate
    /// declaration, matching the one-annotation-per-class rule.
    pub fn register_injectable(&mut self, token: Token, scope: Scope) -> Result<(), Error> {
        if self.scopes.contains_key(&token) {
            return Err(Error::DuplicateAnnotation(format!(
                "injectable scope for \"{}\" is already declared",
                token
            )));
        }
        self.scopes.insert(token, scope);
        Ok(())
    }

    pub fn scope_of(&self, token: &Token) -> Option<Scope> {
        self.scopes.get(token).copied()
    }

    /// Append a handler declaration for a controller.
    pub fn register_handler(&mut self, controller: Token, spec: HandlerSpec) {
        self.handlers.entry(controller).or_default().push(spec);
    }

    pub fn handlers(&self, controller: &Token) -> &[HandlerSpec] {
        self.handlers
            .get(controller)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append parameter declarations for a handler method.
    pub fn register_params(
        &mut self,
        controller: Token,
        method: &'static str,
        specs: Vec<ParamSpec>,
    ) {
        self.params
            .entry((controller, method))
            .or_default()
            .extend(specs);
    }

    pub fn params(&self, controller: &Token, method: &'static str) -> Vec<ParamSpec> {
        self.params
            .get(&(controller.clone(), method))
            .cloned()
            .unwrap_or_default()
    }

    /// Append class-level guards for a controller; these run before any
    /// method-level guards.
    pub fn use_guards(&mut self, controller: Token, guards: Vec<Token>) {
        self.class_guards
            .entry(controller)
            .or_default()
            .extend(guards);
    }

    pub fn class_guards(&self, controller: &Token) -> &[Token] {
        self.class_guards
            .get(controller)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append method-level guards for one handler method.
    pub fn use_method_guards(
        &mut self,
        controller: Token,
        method: &'static str,
        guards: Vec<Token>,
    ) {
        self.method_guards
            .entry((controller, method))
            .or_default()
            .extend(guards);
    }

    pub fn method_guards(&self, controller: &Token, method: &'static str) -> &[Token] {
        self.method_guards
            .get(&(controller.clone(), method))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Record the downcast for a guard type so dispatchers can recover a
    /// `dyn Guard` view from the container.
    pub fn register_guard<G: Guard>(&mut self) -> Result<(), Error> {
        let token = Token::of::<G>();
        if self.guard_casts.contains_key(&token) {
            return Err(Error::DuplicateAnnotation(format!(
                "guard \"{}\" is already registered",
                token
            )));
        }
        self.guard_casts.insert(token, guard_cast_for::<G>);
        Ok(())
    }

    pub fn guard_cast(&self, token: &Token) -> Option<GuardCast> {
        self.guard_casts.get(token).copied()
    }

    /// Ids of every registered module, for diagnostics.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}
