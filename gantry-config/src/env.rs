// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Reads configuration out of process environment variables, optionally
/// filtered by a prefix. Keys are lowercased with the prefix stripped, so
/// `GANTRY_DEBUG=true` with prefix `GANTRY` lands under `debug`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Collect all matching environment variables.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        let mut config = HashMap::new();

        for (key, value) in env::vars() {
            match &self.prefix {
                Some(prefix) => {
                    if key.starts_with(prefix) {
                        let trimmed = key.trim_start_matches(prefix).trim_start_matches('_');
                        config.insert(trimmed.to_lowercase(), value);
                    }
                }
                None => {
                    config.insert(key.to_lowercase(), value);
                }
            }
        }

        Ok(config)
    }

    /// Read a single variable, applying the prefix.
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(&full_key).map_err(ConfigError::Env)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // std::env::set_var is unsafe since Rust 1.78, so these tests stick to
    // variables that already exist or defaults.

    #[test]
    fn test_missing_var_falls_back_to_default() {
        let loader = EnvLoader::new(None);
        assert_eq!(loader.load_var_or("GANTRY_NONEXISTENT_VAR", "fallback"), "fallback");
    }

    #[test]
    fn test_prefixed_lookup_misses_unprefixed_var() {
        let loader = EnvLoader::new(Some("GANTRY_TEST".to_string()));
        assert!(loader.load_var("PATH").is_err());
    }

    #[test]
    fn test_path_resolvable_without_prefix() {
        if std::env::var("PATH").is_ok() {
            let loader = EnvLoader::new(None);
            assert!(loader.load_var("PATH").is_ok());
            assert!(loader.load().unwrap().contains_key("path"));
        }
    }
}
