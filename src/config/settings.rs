use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub chat_api: ChatApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub resync: ResyncConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatApiConfig {
    /// Base URL of the remote assistant API, e.g. `https://api.example.com`
    pub base_url: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    /// Bearer token for the current session
    pub token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Storage backend: "file", "memory" or "redis"
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Directory for the file backend
    #[serde(default = "default_storage_dir")]
    pub dir: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
    /// Logical key the queue is persisted under
    #[serde(default = "default_queue_key")]
    pub queue_key: String,
    /// Optional cap on queued items; enqueue is rejected beyond it
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
    /// Probe the API in the background to derive the online signal
    #[serde(default = "default_true")]
    pub probe_enabled: bool,
    /// URL to probe; defaults to the chat API base URL
    pub probe_url: Option<String>,
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// State assumed before the first probe or host signal
    #[serde(default = "default_true")]
    pub initial_online: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResyncConfig {
    /// What a trigger does while a flush is running: "wait" or "coalesce"
    #[serde(default = "default_overlap_policy")]
    pub overlap_policy: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Finished messages beyond this count are forgotten, oldest first
    #[serde(default = "default_max_tracked_messages")]
    pub max_tracked_messages: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8790
}

fn default_chat_path() -> String {
    "/api/v1/agent/chat".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_storage_backend() -> String {
    "file".to_string()
}

fn default_storage_dir() -> String {
    ".agent-outbox".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_prefix() -> String {
    "agent-outbox".to_string()
}

fn default_queue_key() -> String {
    "agent-message-queue".to_string()
}

fn default_true() -> bool {
    true
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}

fn default_overlap_policy() -> String {
    "wait".to_string()
}

fn default_max_tracked_messages() -> usize {
    1_000
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("chat_api.chat_path", default_chat_path())?
            .set_default("chat_api.timeout_ms", default_timeout_ms() as i64)?
            .set_default("storage.backend", default_storage_backend())?
            .set_default("storage.dir", default_storage_dir())?
            .set_default("storage.queue_key", default_queue_key())?
            .set_default("connectivity.probe_enabled", true)?
            .set_default("connectivity.probe_interval_ms", default_probe_interval_ms() as i64)?
            .set_default("resync.overlap_policy", default_overlap_policy())?
            .set_default(
                "coordinator.max_tracked_messages",
                default_max_tracked_messages() as i64,
            )?
            .set_default("log.format", default_log_format())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // CHAT_API__BASE_URL, STORAGE__BACKEND, CONNECTIVITY__PROBE_ENABLED, ...
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ChatApiConfig {
    pub fn chat_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.chat_path
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ConnectivityConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            dir: default_storage_dir(),
            redis_url: default_redis_url(),
            redis_prefix: default_redis_prefix(),
            queue_key: default_queue_key(),
            max_items: None,
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_enabled: true,
            probe_url: None,
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            initial_online: true,
        }
    }
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            overlap_policy: default_overlap_policy(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_tracked_messages: default_max_tracked_messages(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}
