//! Event/RPC binder: turns handler metadata into driver dispatchers.
//!
//! Binding happens once at start. For every controller handler the binder
//! attaches the recorded parameter specs, computes the guard chain (class
//! guards first, then method guards, declaration order), and registers a
//! dispatcher closure with the platform driver. A dispatch failure is logged
//! with the event and controller names and never propagates into the driver.

use crate::container::Container;
use crate::controller::Controller;
use crate::driver::{Dispatcher, PlatformDriver};
use crate::flow::create_args;
use crate::guard::{ExecutionContext, Guard, evaluate_guards};
use crate::metadata::{EventSource, HandlerKind, HandlerSpec, MetadataRegistry, RpcSource};
use crate::resolver::Resolver;
use crate::token::Token;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Bind every handler of every resolved controller. Returns the number of
/// dispatchers registered.
pub(crate) fn bind_all(resolver: &Resolver, driver: &Arc<dyn PlatformDriver>) -> usize {
    let registry = resolver.registry_handle();
    let mut bound = 0;

    let tokens: Vec<(Token, &'static str)> = resolver
        .graph()
        .iter()
        .flat_map(|module| {
            module.controller_tokens().iter().filter_map(|token| {
                module
                    .controller(token)
                    .map(|def| (token.clone(), def.class_name))
            })
        })
        .collect();

    for (token, class_name) in tokens {
        let Some(controller) = resolver.controller(&token) else {
            warn!(controller = class_name, "controller not instantiated, skipping its handlers");
            continue;
        };
        for spec in registry.handlers(&token) {
            let mut spec = spec.clone();
            spec.params = registry.params(&token, spec.method);

            let mut chain: Vec<Token> = registry.class_guards(&token).to_vec();
            chain.extend(spec.guards.iter().cloned());
            chain.extend(registry.method_guards(&token, spec.method).iter().cloned());

            let kind = spec.kind;
            let name = spec.name.clone();
            let webview = spec.webview.clone();
            let dispatcher = make_dispatcher(
                resolver.container().clone(),
                registry.clone(),
                controller.clone(),
                class_name,
                spec,
                chain,
            );

            if register(driver, kind, &name, webview.as_deref(), dispatcher) {
                debug!(event = %name, controller = class_name, "handler bound");
                bound += 1;
            } else {
                warn!(
                    event = %name,
                    controller = class_name,
                    ?kind,
                    "driver does not support this binding kind, handler skipped"
                );
            }
        }
    }
    bound
}

fn register(
    driver: &Arc<dyn PlatformDriver>,
    kind: HandlerKind,
    name: &str,
    webview: Option<&str>,
    dispatcher: Dispatcher,
) -> bool {
    // A WebView target overrides the kind's channel.
    if let Some(webview) = webview {
        return driver.on_webview(webview, name, dispatcher);
    }
    match kind {
        HandlerKind::Event(EventSource::Any) => {
            driver.on(name, dispatcher);
            true
        }
        HandlerKind::Event(EventSource::Client) => driver.on_client(name, dispatcher),
        HandlerKind::Event(EventSource::Server) => driver.on_server(name, dispatcher),
        HandlerKind::Rpc(RpcSource::Client) => driver.on_rpc_client(name, dispatcher),
        HandlerKind::Rpc(RpcSource::Server) => driver.on_rpc_server(name, dispatcher),
    }
}

fn make_dispatcher(
    container: Container,
    registry: Arc<MetadataRegistry>,
    controller: Arc<dyn Controller>,
    class_name: &'static str,
    spec: HandlerSpec,
    chain: Vec<Token>,
) -> Dispatcher {
    let spec = Arc::new(spec);
    Arc::new(move |raw_args: Vec<Value>| {
        let container = container.clone();
        let registry = registry.clone();
        let controller = controller.clone();
        let spec = spec.clone();
        let chain = chain.clone();
        Box::pin(async move {
            let context = ExecutionContext::new(spec.name.clone(), raw_args);

            let mut guards: Vec<Arc<dyn Guard>> = Vec::with_capacity(chain.len());
            for token in &chain {
                let instance = match container.resolve(token) {
                    Ok(instance) => instance,
                    Err(err) => {
                        error!(event = %spec.name, guard = %token, error = %err, "guard not resolvable, denying");
                        return None;
                    }
                };
                let Some(cast) = registry.guard_cast(token) else {
                    error!(event = %spec.name, guard = %token, "guard has no registered cast, denying");
                    return None;
                };
                let Some(guard) = cast(instance) else {
                    error!(event = %spec.name, guard = %token, "container entry is not this guard type, denying");
                    return None;
                };
                guards.push(guard);
            }

            match evaluate_guards(&context, &guards).await {
                Ok(true) => {}
                Ok(false) => {
                    // Denials are silent no-ops toward the driver.
                    debug!(event = %spec.name, controller = class_name, "guard denied invocation");
                    return None;
                }
                Err(err) => {
                    error!(event = %spec.name, controller = class_name, error = %err, "guard evaluation failed, denying");
                    return None;
                }
            }

            let args = match create_args(&context, &spec) {
                Ok(args) => args,
                Err(err) => {
                    error!(event = %spec.name, controller = class_name, error = %err, "parameter resolution failed");
                    return None;
                }
            };

            match (spec.callback)(controller, args).await {
                Ok(value) => match spec.kind {
                    HandlerKind::Rpc(_) => Some(value),
                    HandlerKind::Event(_) => None,
                },
                Err(err) => {
                    error!(event = %spec.name, controller = class_name, error = %err, "handler failed");
                    None
                }
            }
        })
    })
}
