// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::watermark::{ImageFetcherConfig, WatermarkOptions, DEFAULT_MAX_ARTIFACTS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub watermark: WatermarkOptions,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_cache_entries() -> u64 {
    100
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

/// Background image fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// HTTP request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of decoded images kept in memory (default: 100)
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: u64,

    /// Cache time-to-live in seconds (default: 3600)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_cache_entries: default_max_cache_entries(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl FetchConfig {
    pub fn to_fetcher_config(&self) -> ImageFetcherConfig {
        ImageFetcherConfig {
            max_cache_entries: self.max_cache_entries,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            request_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_max_artifacts() -> u64 {
    DEFAULT_MAX_ARTIFACTS
}

/// Export artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory exported PNG files are written to (default: ./exports)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Export artifacts remembered across previews (default: 1024)
    #[serde(default = "default_max_artifacts")]
    pub max_artifacts: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_artifacts: default_max_artifacts(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; RUST_LOG overrides it (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        // An empty document means all defaults
        if substituted.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.watermark.to_config().map_err(|e| e.to_string())?;

        if self.fetch.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be > 0".to_string());
        }

        if self.fetch.max_cache_entries == 0 {
            return Err("fetch.max_cache_entries must be > 0".to_string());
        }

        if self.export.output_dir.as_os_str().is_empty() {
            return Err("export.output_dir cannot be empty".to_string());
        }

        if self.export.max_artifacts == 0 {
            return Err("export.max_artifacts must be > 0".to_string());
        }

        EnvFilter::try_new(&self.logging.level)
            .map_err(|e| format!("Invalid logging.level '{}': {}", self.logging.level, e))?;

        Ok(())
    }
}
