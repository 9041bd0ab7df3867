// Integration tests for configuration source merging

use gantry_config::{ConfigLoader, ConfigManager, ConfigService, FileFormat};

#[test]
fn test_file_content_merges_over_defaults() {
    let manager = ConfigManager::new();
    manager.set("debug", false).unwrap();
    manager.set("server_name", "default").unwrap();

    let overlay = ConfigManager::new();
    let parsed = ConfigLoader::new(FileFormat::Toml)
        .parse("debug = true\nmax_players = 64\n")
        .unwrap();
    if let serde_json::Value::Object(map) = parsed {
        for (key, value) in map {
            overlay.set(&key, value).unwrap();
        }
    }
    manager.merge(&overlay);

    assert!(manager.get_bool("debug").unwrap());
    assert_eq!(manager.get_int("max_players").unwrap(), 64);
    assert_eq!(manager.get_string("server_name").unwrap(), "default");
}

#[test]
fn test_service_round_trip_through_core_trait() {
    use gantry_core::config::ConfigService as CoreConfig;

    let manager = ConfigManager::new();
    manager.set("tick_rate", 64i64).unwrap();
    let service = ConfigService::from_manager(manager);

    let as_trait: &dyn CoreConfig = &service;
    assert_eq!(as_trait.get_int("tick_rate"), Some(64));
    assert!(!as_trait.has("absent"));
}

#[test]
fn test_builder_without_sources_yields_empty_service() {
    let service = ConfigService::builder().build().unwrap();
    assert!(service.manager().keys().is_empty());
}
