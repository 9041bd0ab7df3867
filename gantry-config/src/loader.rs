// Configuration file loaders

use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }
}

/// Parses configuration files into a flat JSON object.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the format from the file extension.
    pub fn auto(path: &str) -> Result<Self> {
        let ext = Path::new(path)
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::Load("no file extension".to_string()))?;
        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::Load(format!("unsupported format: {}", ext)))?;
        Ok(Self::new(format))
    }

    pub fn load_file(&self, path: &str) -> Result<Value> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("failed to read {}: {}", path, e)))?;
        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::Parse(format!("json: {}", e))),
            FileFormat::Toml => parse_toml(content),
            FileFormat::Env => Ok(parse_env(content)),
        }
    }
}

fn parse_toml(content: &str) -> Result<Value> {
    let value: toml::Value =
        toml::from_str(content).map_err(|e| ConfigError::Parse(format!("toml: {}", e)))?;
    serde_json::to_value(value).map_err(|e| ConfigError::Serialization(e.to_string()))
}

fn parse_env(content: &str) -> Value {
    let mut map = serde_json::Map::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            map.insert(key.trim().to_string(), Value::String(value.to_string()));
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let value = loader.parse(r#"{"debug": true, "port": 30120}"#).unwrap();
        assert_eq!(value["port"], json!(30120));
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let value = loader
            .parse("debug = true\nserver_name = \"dev\"\n")
            .unwrap();
        assert_eq!(value["server_name"], json!("dev"));
    }

    #[test]
    fn test_parse_env_lines() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let value = loader
            .parse("# comment\nDEBUG=true\nNAME=\"quoted\"\n\n")
            .unwrap();
        assert_eq!(value["DEBUG"], json!("true"));
        assert_eq!(value["NAME"], json!("quoted"));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("JSON"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("toml"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("yaml"), None);
        assert!(ConfigLoader::auto("settings.toml").is_ok());
        assert!(ConfigLoader::auto("settings").is_err());
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let loader = ConfigLoader::new(FileFormat::Json);
        assert!(matches!(loader.parse("{oops"), Err(ConfigError::Parse(_))));
    }
}
