//! Configuration seam.
//!
//! The engine never parses configuration itself; it resolves an optional
//! [`ConfigService`] under the well-known `CONFIG_SERVICE` token during
//! bootstrap and falls back to defaults when none is provided. The
//! `gantry-config` crate ships the standard implementation.

use crate::provider::Instance;
use std::any::Any;
use std::sync::Arc;

/// Object-safe configuration lookup.
pub trait ConfigService: Any + Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_int(&self, key: &str) -> Option<i64>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn has(&self, key: &str) -> bool;
}

/// Recover the `dyn ConfigService` view from a container entry. The service
/// is stored as an `Arc<dyn ConfigService>` wrapped in the `Any` arc.
pub fn config_from_instance(instance: &Instance) -> Option<Arc<dyn ConfigService>> {
    instance
        .downcast_ref::<Arc<dyn ConfigService>>()
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<String, String>);

    impl ConfigService for MapConfig {
        fn get_string(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn get_int(&self, key: &str) -> Option<i64> {
            self.0.get(key)?.parse().ok()
        }

        fn get_bool(&self, key: &str) -> Option<bool> {
            self.0.get(key)?.parse().ok()
        }

        fn has(&self, key: &str) -> bool {
            self.0.contains_key(key)
        }
    }

    #[test]
    fn test_config_recovered_from_instance() {
        let mut map = HashMap::new();
        map.insert("debug".to_string(), "true".to_string());
        let service: Arc<dyn ConfigService> = Arc::new(MapConfig(map));
        let instance: Instance = Arc::new(service);

        let recovered = config_from_instance(&instance).unwrap();
        assert_eq!(recovered.get_bool("debug"), Some(true));
        assert!(!recovered.has("missing"));
    }

    #[test]
    fn test_plain_instance_is_not_a_config() {
        let instance: Instance = Arc::new(42u32);
        assert!(config_from_instance(&instance).is_none());
    }
}
