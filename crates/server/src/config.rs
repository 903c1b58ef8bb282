use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Whole-workflow deadline in seconds; `0` means "use the engine default".
    #[serde(default)]
    pub workflow_timeout_secs: u64,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_filter() -> String {
    "tenantops=info,tower_http=info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workflow_timeout_secs: 0,
            log_filter: default_log_filter(),
        }
    }
}

impl ServerConfig {
    /// Loads from an optional TOML file, falling back to defaults when it
    /// doesn't exist; `host`/`port` are then overridden by CLI flags.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!(path = %config_path.display(), "configuration file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(config_path).context("failed to read configuration file")?;
        toml::from_str(&content).context("failed to parse configuration file")
    }

    pub fn workflow_timeout(&self) -> Option<Duration> {
        if self.workflow_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.workflow_timeout_secs))
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
