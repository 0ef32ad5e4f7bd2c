//! Configuration management for the search API
//!
//! Configuration is read from a TOML file (default `imago.toml`). Every
//! section is optional and falls back to its defaults. A handful of
//! environment variables override the file after loading:
//!
//! | Variable                 | Field                        |
//! |--------------------------|------------------------------|
//! | `ELASTICSEARCH_HOST`     | `elasticsearch.host`         |
//! | `ELASTICSEARCH_PORT`     | `elasticsearch.port`         |
//! | `ELASTICSEARCH_USERNAME` | `elasticsearch.username`     |
//! | `ELASTICSEARCH_PASSWORD` | `elasticsearch.password`     |
//! | `ELASTICSEARCH_INDEX`    | `elasticsearch.index`        |
//! | `IMAGO_BASE_URL`         | `media.base_url`             |
//! | `LOG_FORMAT`             | `observability.log_format`   |

mod search;

pub use search::SearchSettings;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub cors: CorsConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Enable CORS (default: true, the frontend is served from another origin)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allowed origins. Use "*" for any origin.
    #[serde(default = "default_cors_origins")]
    pub origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: default_cors_origins(),
        }
    }
}

/// Connection settings for the Elasticsearch cluster
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElasticsearchConfig {
    /// Scheme and host, e.g. `https://es.example.com`
    #[serde(default = "default_es_host")]
    pub host: String,
    #[serde(default = "default_es_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_es_index")]
    pub index: String,
    /// Verify the server's TLS certificate
    #[serde(default = "default_true")]
    pub verify_certs: bool,
    /// Timeout for a single engine call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_es_host() -> String {
    "http://localhost".to_string()
}

fn default_es_port() -> u16 {
    9200
}

fn default_es_index() -> String {
    "imago".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            host: default_es_host(),
            port: default_es_port(),
            username: None,
            password: None,
            index: default_es_index(),
            verify_certs: true,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ElasticsearchConfig {
    /// Base URL of the cluster, `host:port`
    pub fn url(&self) -> String {
        format!("{}:{}", self.host.trim_end_matches('/'), self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Where thumbnails are served from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_base_url")]
    pub base_url: String,
}

fn default_media_base_url() -> String {
    "https://www.imago-images.de".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_url: default_media_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable Prometheus metrics at GET /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,imago=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            metrics_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load config from a TOML file, falling back to defaults when the file
    /// does not exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        } else {
            tracing::info!("Config file {} not found, using defaults", path.display());
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production). Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = var("ELASTICSEARCH_HOST") {
            self.elasticsearch.host = host;
        }
        if let Some(port) = var("ELASTICSEARCH_PORT") {
            self.elasticsearch.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow!("invalid ELASTICSEARCH_PORT {:?}: {}", port, e))?;
        }
        if let Some(username) = var("ELASTICSEARCH_USERNAME") {
            self.elasticsearch.username = Some(username);
        }
        if let Some(password) = var("ELASTICSEARCH_PASSWORD") {
            self.elasticsearch.password = Some(password);
        }
        if let Some(index) = var("ELASTICSEARCH_INDEX") {
            self.elasticsearch.index = index;
        }
        if let Some(base_url) = var("IMAGO_BASE_URL") {
            self.media.base_url = base_url;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.observability.log_format = format;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.elasticsearch.index.trim().is_empty() {
            return Err(anyhow!("elasticsearch.index must not be empty"));
        }
        url::Url::parse(&self.elasticsearch.url())
            .with_context(|| format!("invalid Elasticsearch URL {}", self.elasticsearch.url()))?;
        Ok(())
    }
}
