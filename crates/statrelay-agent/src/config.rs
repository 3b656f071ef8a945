use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Collector address, `host:port` or a full URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    /// Per-request send timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Shared HMAC signing key; absent sends unsigned batches.
    #[serde(default)]
    pub sign_key: Option<String>,
}

fn default_endpoint() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_report_interval() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    4
}

impl AgentConfig {
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

    /// Base URL for the collector, scheme added when missing.
    pub fn base_url(&self) -> String {
        let addr = self.endpoint.trim();
        if addr.contains("://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        }
    }
}
