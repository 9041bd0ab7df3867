//! Platform driver: the seam between the engine and the host runtime.
//!
//! The engine never talks to a game server or transport directly; it hands
//! dispatchers to a [`PlatformDriver`] and emits through it. Only `on` and
//! `emit` are required. The scoped registration and RPC methods are optional;
//! a driver that cannot support one reports it as unsupported and the binder
//! skips the affected handlers with a warning.

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// The bound runtime function for one declared event or RPC: parameter
/// resolution, guard evaluation, handler invocation. Returns `Some` with the
/// reply for RPCs, `None` for events and denied invocations.
pub type Dispatcher = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Option<Value>> + Send + Sync>;

/// Host-runtime adapter the application binds its handlers to.
///
/// Optional methods return whether the registration was accepted; the
/// defaults decline. Invocation methods return the reply, `None` when
/// unsupported.
pub trait PlatformDriver: Send + Sync {
    /// Register a dispatcher for an event of any origin. Required.
    fn on(&self, name: &str, dispatcher: Dispatcher);

    /// Emit an event into the host runtime. Required.
    fn emit(&self, name: &str, args: Vec<Value>);

    /// Register a dispatcher for client-originated events.
    fn on_client(&self, _name: &str, _dispatcher: Dispatcher) -> bool {
        false
    }

    /// Register a dispatcher for server-originated events.
    fn on_server(&self, _name: &str, _dispatcher: Dispatcher) -> bool {
        false
    }

    /// Register a dispatcher for RPCs invoked by clients.
    fn on_rpc_client(&self, _name: &str, _dispatcher: Dispatcher) -> bool {
        false
    }

    /// Register a dispatcher for RPCs invoked by the server.
    fn on_rpc_server(&self, _name: &str, _dispatcher: Dispatcher) -> bool {
        false
    }

    /// Register a dispatcher for events originating from a specific WebView
    /// instance. Handlers declared with a WebView target bind through this
    /// method instead of their kind's channel.
    fn on_webview(&self, _webview: &str, _name: &str, _dispatcher: Dispatcher) -> bool {
        false
    }

    /// Emit an event to a specific client.
    fn emit_client(&self, _target: &Value, _name: &str, _args: Vec<Value>) -> bool {
        false
    }

    /// Emit an event server-side only.
    fn emit_server(&self, _name: &str, _args: Vec<Value>) -> bool {
        false
    }

    /// Invoke an RPC on a client and await its reply.
    fn invoke_client<'a>(
        &'a self,
        _target: &'a Value,
        _name: &'a str,
        _args: Vec<Value>,
    ) -> BoxFuture<'a, Option<Value>> {
        Box::pin(async { None })
    }

    /// Invoke a server-side RPC and await its reply.
    fn invoke_server<'a>(&'a self, _name: &'a str, _args: Vec<Value>) -> BoxFuture<'a, Option<Value>> {
        Box::pin(async { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MinimalDriver {
        bound: Mutex<Vec<String>>,
        emitted: Mutex<Vec<String>>,
    }

    impl PlatformDriver for MinimalDriver {
        fn on(&self, name: &str, _dispatcher: Dispatcher) {
            self.bound.lock().push(name.to_string());
        }

        fn emit(&self, name: &str, _args: Vec<Value>) {
            self.emitted.lock().push(name.to_string());
        }
    }

    #[tokio::test]
    async fn test_optional_methods_decline_by_default() {
        let driver = MinimalDriver::default();
        let dispatcher: Dispatcher = Arc::new(|_| Box::pin(async { None }));

        assert!(!driver.on_client("a", dispatcher.clone()));
        assert!(!driver.on_rpc_server("b", dispatcher.clone()));
        assert!(!driver.on_webview("hud", "b", dispatcher));
        assert!(!driver.emit_server("c", vec![]));
        assert!(driver.invoke_server("d", vec![]).await.is_none());
    }

    #[test]
    fn test_required_methods_reach_the_driver() {
        let driver = MinimalDriver::default();
        driver.on("chat:message", Arc::new(|_| Box::pin(async { None })));
        driver.emit("chat:message", vec![Value::Null]);
        assert_eq!(driver.bound.lock().as_slice(), &["chat:message".to_string()]);
        assert_eq!(driver.emitted.lock().len(), 1);
    }
}
