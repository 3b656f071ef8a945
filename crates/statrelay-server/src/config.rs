use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Shared HMAC signing key; absent disables hash verification.
    #[serde(default)]
    pub sign_key: Option<String>,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Database URL; when set, metrics persist in the relational backend
    /// instead of memory.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// Seconds between snapshot flushes; 0 disables the ticker.
    #[serde(default = "default_store_interval")]
    pub store_interval_secs: u64,
    /// Restore the store from the snapshot file at startup.
    #[serde(default = "default_restore")]
    pub restore: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            snapshot_path: default_snapshot_path(),
            store_interval_secs: default_store_interval(),
            restore: default_restore(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_snapshot_path() -> String {
    "/tmp/metrics-db.json".to_string()
}

fn default_store_interval() -> u64 {
    300
}

fn default_restore() -> bool {
    true
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Falls back to built-in defaults when the file does not exist.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(toml::from_str("")?)
        }
    }
}
