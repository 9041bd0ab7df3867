//! Application: bootstrap, start, shutdown.
//!
//! `create` scans the module graph and instantiates everything; `start` binds
//! handlers to the driver; `close` runs shutdown hooks and tears the
//! container down. The state machine only moves forward: Initialized to
//! Started to Closed.

use crate::binder;
use crate::config::{ConfigService, config_from_instance};
use crate::container::Container;
use crate::controller::Controller;
use crate::driver::PlatformDriver;
use crate::error::Error;
use crate::graph::ModuleGraph;
use crate::metadata::MetadataRegistry;
use crate::module::ModuleId;
use crate::provider::Instance;
use crate::resolver::Resolver;
use crate::token::{CONFIG_SERVICE, PLATFORM_DRIVER, Token};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppState {
    Initialized,
    Started,
    Closed,
}

/// The composed application: resolved modules, bound driver, lifecycle
/// control.
pub struct Application {
    resolver: Resolver,
    driver: Arc<dyn PlatformDriver>,
    /// Controllers in instantiation order, for hook dispatch.
    controllers: Vec<(Token, Arc<dyn Controller>)>,
    config: Option<Arc<dyn ConfigService>>,
    state: Mutex<AppState>,
}

impl Application {
    /// Bootstrap from a populated registry: scan the graph, register the
    /// driver, resolve configuration, instantiate every provider and
    /// controller, run `on_init` hooks.
    pub async fn create(
        registry: MetadataRegistry,
        root: ModuleId,
        driver: Arc<dyn PlatformDriver>,
    ) -> Result<Self, Error> {
        let registry = Arc::new(registry);
        let graph = Arc::new(ModuleGraph::scan(&registry, root)?);

        let container = Container::new();
        container.register(PLATFORM_DRIVER.clone(), Arc::new(driver.clone()) as Instance);

        let resolver = Resolver::new(registry, graph, container);
        let config = resolve_config(&resolver, root).await;
        if let Some(config) = &config {
            if config.get_bool("debug") == Some(true) {
                for line in resolver.graph().tree_lines() {
                    info!("module: {}", line);
                }
            }
        }

        let mut controllers = Vec::new();
        let module_ids: Vec<ModuleId> = resolver.graph().iter().map(|m| m.id).collect();
        for id in module_ids {
            let provider_tokens = resolver
                .graph()
                .module(&id)
                .map(|m| m.provider_tokens().to_vec())
                .unwrap_or_default();
            for token in provider_tokens {
                let mut seen = HashSet::new();
                resolver.resolve(&token, id, &mut seen).await?;
            }

            let controller_tokens = resolver
                .graph()
                .module(&id)
                .map(|m| m.controller_tokens().to_vec())
                .unwrap_or_default();
            for token in controller_tokens {
                let mut seen = HashSet::new();
                resolver.resolve(&token, id, &mut seen).await?;
                let controller = resolver.controller(&token).ok_or_else(|| {
                    Error::Internal(format!("controller \"{}\" vanished after resolution", token))
                })?;
                controllers.push((token, controller));
            }
        }
        info!(
            modules = resolver.graph().len(),
            controllers = controllers.len(),
            "application instantiated"
        );

        for (token, controller) in &controllers {
            debug!(controller = %token, "running on_init");
            controller.on_init().await?;
        }

        Ok(Self {
            resolver,
            driver,
            controllers,
            config,
            state: Mutex::new(AppState::Initialized),
        })
    }

    /// Bind every declared handler to the driver and run `on_started` hooks.
    /// Calling it again, or after close, is a logged no-op.
    pub async fn start(&self) -> Result<(), Error> {
        {
            let mut state = self.state.lock();
            if *state != AppState::Initialized {
                warn!(state = ?*state, "start ignored");
                return Ok(());
            }
            *state = AppState::Started;
        }

        let bound = binder::bind_all(&self.resolver, &self.driver);
        info!(handlers = bound, "application started");

        for (token, controller) in &self.controllers {
            debug!(controller = %token, "running on_started");
            controller.on_started().await?;
        }
        Ok(())
    }

    /// Run `on_shutdown` hooks and invalidate the container. Idempotent.
    pub async fn close(&self, signal: Option<&str>) -> Result<(), Error> {
        {
            let mut state = self.state.lock();
            if *state == AppState::Closed {
                warn!("close ignored, application already closed");
                return Ok(());
            }
            *state = AppState::Closed;
        }

        for (token, controller) in &self.controllers {
            debug!(controller = %token, "running on_shutdown");
            controller.on_shutdown(signal).await?;
        }
        self.resolver.container().clear();
        info!(signal = signal.unwrap_or("none"), "application closed");
        Ok(())
    }

    /// Fetch a resolved instance by token.
    pub fn get_by_token(&self, token: &Token) -> Result<Instance, Error> {
        self.resolver.container().resolve(token)
    }

    /// Fetch a resolved instance by its type token.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        self.resolver.container().resolve_as::<T>()
    }

    /// The configuration service resolved at bootstrap, if any.
    pub fn config(&self) -> Option<&Arc<dyn ConfigService>> {
        self.config.as_ref()
    }

    pub fn driver(&self) -> &Arc<dyn PlatformDriver> {
        &self.driver
    }

    /// Emit an event through the platform driver.
    pub fn emit(&self, name: &str, args: Vec<Value>) {
        self.driver.emit(name, args);
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("modules", &self.resolver.graph().len())
            .field("controllers", &self.controllers.len())
            .field("config", &self.config.is_some())
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Configuration is optional; a missing service degrades to defaults.
async fn resolve_config(resolver: &Resolver, root: ModuleId) -> Option<Arc<dyn ConfigService>> {
    let mut seen = HashSet::new();
    match resolver.resolve(&CONFIG_SERVICE, root, &mut seen).await {
        Ok(instance) => match config_from_instance(&instance) {
            Some(config) => Some(config),
            None => {
                warn!("CONFIG_SERVICE entry is not a ConfigService, using defaults");
                None
            }
        },
        Err(err) => {
            warn!(error = %err, "no configuration service registered, using defaults");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerDef;
    use crate::driver::Dispatcher;
    use crate::metadata::{HandlerSpec, handler_fn};
    use crate::module::ModuleDescriptor;
    use crate::provider::ValueProvider;
    use async_trait::async_trait;
    use parking_lot::Mutex as PlMutex;
    use serde_json::json;

    struct AppModule;

    #[derive(Default)]
    struct RecordingDriver {
        bound: PlMutex<Vec<String>>,
        emitted: PlMutex<Vec<String>>,
    }

    impl PlatformDriver for RecordingDriver {
        fn on(&self, name: &str, _dispatcher: Dispatcher) {
            self.bound.lock().push(name.to_string());
        }

        fn emit(&self, name: &str, _args: Vec<Value>) {
            self.emitted.lock().push(name.to_string());
        }
    }

    #[derive(Default)]
    struct Phases(PlMutex<Vec<String>>);

    struct LifecycleController {
        phases: Arc<Phases>,
    }

    #[async_trait]
    impl Controller for LifecycleController {
        async fn on_init(&self) -> Result<(), Error> {
            self.phases.0.lock().push("init".into());
            Ok(())
        }

        async fn on_started(&self) -> Result<(), Error> {
            self.phases.0.lock().push("started".into());
            Ok(())
        }

        async fn on_shutdown(&self, signal: Option<&str>) -> Result<(), Error> {
            self.phases
                .0
                .lock()
                .push(format!("shutdown:{}", signal.unwrap_or("none")));
            Ok(())
        }
    }

    fn lifecycle_registry(phases: Arc<Phases>) -> MetadataRegistry {
        let mut registry = MetadataRegistry::new();
        registry
            .register_module::<AppModule>(
                ModuleDescriptor::new()
                    .provider(ValueProvider::new(Token::name("greeting"), "hello".to_string()))
                    .controller(ControllerDef::new::<LifecycleController>(move |_| {
                        Ok(Box::new(LifecycleController {
                            phases: phases.clone(),
                        }))
                    })),
            )
            .unwrap();
        registry.register_handler(
            Token::of::<LifecycleController>(),
            HandlerSpec::on(
                "app:ping",
                "on_ping",
                handler_fn(|_, _| async { Ok(Value::Null) }),
            ),
        );
        registry
    }

    async fn app_with(phases: Arc<Phases>) -> (Application, Arc<RecordingDriver>) {
        let driver = Arc::new(RecordingDriver::default());
        let app = Application::create(
            lifecycle_registry(phases),
            ModuleId::of::<AppModule>(),
            driver.clone(),
        )
        .await
        .unwrap();
        (app, driver)
    }

    #[tokio::test]
    async fn test_full_lifecycle_order() {
        let phases = Arc::new(Phases::default());
        let (app, driver) = app_with(phases.clone()).await;

        app.start().await.unwrap();
        app.close(Some("SIGINT")).await.unwrap();

        assert_eq!(
            phases.0.lock().as_slice(),
            &["init".to_string(), "started".into(), "shutdown:SIGINT".into()]
        );
        assert_eq!(driver.bound.lock().as_slice(), &["app:ping".to_string()]);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let phases = Arc::new(Phases::default());
        let (app, driver) = app_with(phases.clone()).await;

        app.start().await.unwrap();
        app.start().await.unwrap();
        assert_eq!(driver.bound.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_invalidates_container() {
        let phases = Arc::new(Phases::default());
        let (app, _driver) = app_with(phases.clone()).await;

        app.start().await.unwrap();
        assert!(app.get_by_token(&Token::name("greeting")).is_ok());

        app.close(None).await.unwrap();
        app.close(None).await.unwrap();

        assert_eq!(
            phases
                .0
                .lock()
                .iter()
                .filter(|phase| phase.starts_with("shutdown"))
                .count(),
            1
        );
        assert!(matches!(
            app.get_by_token(&Token::name("greeting")),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_start_after_close_is_noop() {
        let phases = Arc::new(Phases::default());
        let (app, driver) = app_with(phases.clone()).await;

        app.close(None).await.unwrap();
        app.start().await.unwrap();
        assert!(driver.bound.lock().is_empty());
    }

    #[tokio::test]
    async fn test_driver_registered_under_well_known_token() {
        let phases = Arc::new(Phases::default());
        let (app, _driver) = app_with(phases).await;
        assert!(app.get_by_token(&PLATFORM_DRIVER).is_ok());
    }

    #[tokio::test]
    async fn test_emit_reaches_driver() {
        let phases = Arc::new(Phases::default());
        let (app, driver) = app_with(phases).await;
        app.emit("app:tick", vec![json!(1)]);
        assert_eq!(driver.emitted.lock().as_slice(), &["app:tick".to_string()]);
    }
}
