// Configuration unit tests
// Loading YAML files the way the binary does

use std::io::Write;
use std::path::PathBuf;

use filigrane::config::{AppConfig, LogFormat};
use filigrane::watermark::{CoverageMode, Rgba, WatermarkOptions};

fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(yaml.as_bytes())
        .expect("Failed to write config");
    file
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r##"
watermark:
  imageUrl: "file:///srv/posters/launch.png"
  content: "INTERNAL USE ONLY"
  contentColor: "#FF000080"
  contentSize: 18
  level: 40
  vertical: 120
  lazy: false
  coverage: diagonal
fetch:
  timeout_secs: 5
  max_cache_entries: 10
export:
  output_dir: "/tmp/filigrane"
logging:
  level: debug
  format: json
"##,
    );

    let config = AppConfig::from_file(file.path()).unwrap();
    assert!(config.validate().is_ok());

    let render = config.watermark.to_config().unwrap();
    assert_eq!(render.text, "INTERNAL USE ONLY");
    assert_eq!(render.text_color, Rgba::new(255, 0, 0, 128));
    assert_eq!(render.font_size_px, 18.0);
    assert_eq!(render.horizontal_gap_px, 40.0);
    assert_eq!(render.vertical_gap_px, 120.0);
    assert!(!render.lazy);
    assert_eq!(render.coverage, CoverageMode::Diagonal);

    assert_eq!(config.fetch.timeout_secs, 5);
    assert_eq!(config.fetch.cache_ttl_secs, 3600);
    assert_eq!(config.export.output_dir, PathBuf::from("/tmp/filigrane"));
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_partial_watermark_section_keeps_defaults() {
    let config = AppConfig::from_yaml_with_env("watermark:\n  content: \"hello\"\n").unwrap();
    let defaults = WatermarkOptions::default();

    assert_eq!(config.watermark.content, "hello");
    assert_eq!(config.watermark.content_size, defaults.content_size);
    assert_eq!(config.watermark.level, defaults.level);
    assert_eq!(config.watermark.vertical, defaults.vertical);
    assert_eq!(config.watermark.angle, -45.0);
    assert!(config.watermark.lazy);
}

#[test]
fn test_env_substitution_in_file() {
    std::env::set_var("FILIGRANE_TEST_POSTER", "https://cdn.test/poster.png");
    let file = write_config("watermark:\n  imageUrl: \"${FILIGRANE_TEST_POSTER}\"\n");

    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config.watermark.image_url, "https://cdn.test/poster.png");
}

#[test]
fn test_missing_file() {
    let err = AppConfig::from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(err.contains("Failed to read config file"));
}

#[test]
fn test_malformed_yaml() {
    assert!(AppConfig::from_yaml_with_env("watermark: [1, 2").is_err());
}

#[test]
fn test_invalid_watermark_fails_validation() {
    let config = AppConfig::from_yaml_with_env("watermark:\n  vertical: 0\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains("Vertical gap"));
}

#[test]
fn test_unknown_log_level_fails_validation() {
    let config = AppConfig::from_yaml_with_env("logging:\n  level: filigrane=loud\n").unwrap();
    assert!(config.validate().unwrap_err().contains("logging.level"));
}
