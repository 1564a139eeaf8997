use super::data::{Config, MockConfig};
use super::io::ConfigError;
use crate::core::backend::BackendMode;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config.data_dir, None);
    assert_eq!(config.backend_mode(), BackendMode::Mock);
    assert!(config.base_urls.is_empty());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        data_dir: Some(PathBuf::from("/tmp/mcp-data")),
        backend: Some(BackendMode::Live),
        mock: Some(MockConfig::instant()),
        base_urls: [("openai".to_string(), "http://localhost:8080/v1".to_string())]
            .into_iter()
            .collect(),
    };
    config
        .save_to_path(&config_path)
        .expect("Failed to save config");

    let loaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded.data_dir, Some(PathBuf::from("/tmp/mcp-data")));
    assert_eq!(loaded.backend_mode(), BackendMode::Live);
    assert_eq!(loaded.mock, Some(MockConfig::instant()));
    assert_eq!(
        loaded.base_url_override("OpenAI"),
        Some("http://localhost:8080/v1")
    );
    assert_eq!(loaded.base_url_override("google"), None);

    let mut config = loaded;
    config.backend = None;
    config
        .save_to_path(&config_path)
        .expect("Failed to save modified config");
    let loaded = Config::load_from_path(&config_path).expect("Failed to reload");
    assert_eq!(loaded.backend, None);
    assert_eq!(loaded.data_dir, Some(PathBuf::from("/tmp/mcp-data")));
}

#[test]
fn partial_mock_table_uses_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[mock]\nlatency_ms = 0\n").unwrap();

    let config = Config::load_from_path(&config_path).unwrap();
    let mock = config.mock.unwrap();
    assert_eq!(mock.latency_ms, 0);
    assert_eq!(mock.chunk_delay_min_ms, 50);
    assert_eq!(mock.chunk_delay_max_ms, 150);
}

#[test]
fn invalid_toml_reports_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "backend = [").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at"));
}

#[test]
fn data_dir_resolution_prefers_override_then_config() {
    let config = Config {
        data_dir: Some(PathBuf::from("/from/config")),
        ..Default::default()
    };
    assert_eq!(
        config.resolve_data_dir(Some(Path::new("/from/flag"))).unwrap(),
        PathBuf::from("/from/flag")
    );
    assert_eq!(
        config.resolve_data_dir(None).unwrap(),
        PathBuf::from("/from/config")
    );
}
