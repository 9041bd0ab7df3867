// ConfigService: the DI-facing configuration surface

use crate::{ConfigManager, FileFormat, Result};
use gantry_core::provider::{Instance, ValueProvider};
use gantry_core::token::CONFIG_SERVICE;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Configuration service handed to the application under the well-known
/// `CONFIG_SERVICE` token.
///
/// ```no_run
/// use gantry_config::ConfigService;
///
/// let config = ConfigService::builder()
///     .with_prefix("GANTRY".to_string())
///     .load_env()
///     .build()
///     .unwrap();
/// let provider = config.provider();
/// // register `provider` in the root module
/// ```
#[derive(Clone, Default)]
pub struct ConfigService {
    manager: ConfigManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manager(manager: ConfigManager) -> Self {
        Self { manager }
    }

    pub fn builder() -> ConfigServiceBuilder {
        ConfigServiceBuilder::new()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.manager.get(key)
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.manager.get_or(key, default)
    }

    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }

    /// Package this service as a value provider under `CONFIG_SERVICE`,
    /// ready to be declared in the root module.
    pub fn provider(self) -> ValueProvider {
        let service: Arc<dyn gantry_core::config::ConfigService> = Arc::new(self);
        let instance: Instance = Arc::new(service);
        ValueProvider::from_instance(CONFIG_SERVICE.clone(), instance)
    }
}

impl gantry_core::config::ConfigService for ConfigService {
    fn get_string(&self, key: &str) -> Option<String> {
        self.manager.get_string(key).ok()
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.manager.get_int(key).ok()
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.manager.get_bool(key).ok()
    }

    fn has(&self, key: &str) -> bool {
        self.manager.has(key)
    }
}

/// Builder assembling a service from its sources, applied in order: .env
/// file, environment, then config files.
#[derive(Default)]
pub struct ConfigServiceBuilder {
    manager: ConfigManager,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<String>,
    config_files: Vec<(String, FileFormat)>,
}

impl ConfigServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: String) -> Self {
        self.manager = ConfigManager::with_prefix(prefix);
        self
    }

    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn load_dotenv(mut self, path: Option<String>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    pub fn add_file(mut self, path: String, format: FileFormat) -> Self {
        self.config_files.push((path, format));
        self
    }

    pub fn build(self) -> Result<ConfigService> {
        if self.load_dotenv {
            self.manager.load_dotenv(self.dotenv_path.as_deref())?;
        } else if self.load_env {
            self.manager.load_env()?;
        }

        for (path, format) in self.config_files {
            self.manager.load_file(&path, format)?;
        }
        Ok(ConfigService::from_manager(self.manager))
    }
}
