use crate::search::SearchConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Search engine connection
    pub engine: EngineConfig,

    /// Checkpoint backend configuration
    pub state: StateConfig,

    /// Indexing pipeline tuning
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Query-time relevance switches and content extensions
    #[serde(default)]
    pub search: SearchConfig,

    /// Where forum rows are read from
    #[serde(default)]
    pub source: SourceConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/forum-search.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: FORUM_SEARCH__)
            .add_source(
                config::Environment::with_prefix("FORUM_SEARCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Elasticsearch base url
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Index shared by all content types
    #[serde(default = "default_index")]
    pub index: String,

    /// Basic auth user
    pub username: Option<String>,

    /// Environment variable holding the basic auth password
    pub password_env: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Tokenizer the index analyzers are built on
    #[serde(default = "default_tokenizer")]
    pub tokenizer: String,
}

impl EngineConfig {
    /// Resolve the password from the configured environment variable
    pub fn password(&self) -> Option<String> {
        self.password_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Checkpoint backend type
    #[serde(default)]
    pub backend: StateBackend,

    /// Path for the embedded database (sled)
    pub path: Option<PathBuf>,

    /// Redis connection string
    pub redis_url: Option<String>,

    /// Namespace for redis keys
    pub key_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StateBackend {
    #[default]
    Sled,
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Ids covered by one scan window
    #[serde(default = "default_window_size")]
    pub window_size: i64,

    /// Bulk write workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pending bulk jobs before `push` waits
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Pause between windows (seconds), 0 disables throttling
    #[serde(default)]
    pub throttle_secs: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            throttle_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// JSON export of the forum tables
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

fn default_engine_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "forum".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_tokenizer() -> String {
    "standard".to_string()
}

fn default_window_size() -> i64 {
    1000
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}
