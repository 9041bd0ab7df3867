// Configuration management for the Gantry framework

pub mod config_service;
pub mod env;
pub mod error;
pub mod loader;

pub use config_service::{ConfigService, ConfigServiceBuilder};
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared key/value configuration store. Values are kept as JSON so env,
/// .env, JSON, and TOML sources merge into one map.
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, serde_json::Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only environment variables starting with `prefix` are loaded, with
    /// the prefix stripped.
    pub fn with_prefix(prefix: String) -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: Some(prefix),
        }
    }

    /// Merge process environment variables into the store.
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let vars = loader.load()?;

        let mut config = self.config.write();
        for (key, value) in vars {
            config.insert(key, serde_json::Value::String(value));
        }
        Ok(())
    }

    /// Load a .env file, then the environment.
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::Load(e.to_string()))?;
            }
            None => {
                // A missing default .env is not an error.
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    /// Merge a configuration file into the store.
    pub fn load_file(&self, path: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;

        let mut config = self.config.write();
        if let serde_json::Value::Object(map) = data {
            for (key, value) in map {
                config.insert(key, value);
            }
        }
        Ok(())
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value =
            serde_json::to_value(value).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        self.config.write().insert(key.to_string(), value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let config = self.config.read();
        let value = config
            .get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;
        serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::Deserialization(e.to_string()))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        // Env sources store strings; accept "true"/"false" there too.
        match self.get::<serde_json::Value>(key)? {
            serde_json::Value::Bool(b) => Ok(b),
            serde_json::Value::String(s) => s
                .parse()
                .map_err(|_| ConfigError::Deserialization(format!("\"{}\" is not a bool", s))),
            other => Err(ConfigError::Deserialization(format!(
                "{} is not a bool",
                other
            ))),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.config.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }

    /// Copy every entry from another manager, overriding on conflict.
    pub fn merge(&self, other: &ConfigManager) {
        let other_config = other.config.read();
        let mut config = self.config.write();
        for (key, value) in other_config.iter() {
            config.insert(key.clone(), value.clone());
        }
    }
}
