//! Configuration for triekv components

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Broker-specific config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker: Option<BrokerConfig>,

    /// Storage-node-specific config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeConfig>,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker: None,
            node: None,
            log_level: default_log_level(),
        }
    }
}

/// Broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// File listing storage nodes, one `<address> <port>` per line
    pub server_file: PathBuf,

    /// File of pre-flattened records to bulk-index at startup
    pub data_file: PathBuf,

    /// Replication factor (k)
    #[serde(default = "default_replication")]
    pub replication: usize,

    /// Per-node round-trip deadline in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_replication() -> usize {
    2
}
fn default_request_timeout_ms() -> u64 {
    5_000
}

impl BrokerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            server_file: PathBuf::from("./serverFile.txt"),
            data_file: PathBuf::from("./dataToIndex.txt"),
            replication: default_replication(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Storage node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address and port to listen on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:7000".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Config {
    /// Load configuration from `triekv.toml` (if present) and `TRIEKV_*`
    /// environment variables. CLI arguments are merged on top by the
    /// binaries.
    pub fn load() -> Self {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("triekv").required(false))
            .add_source(config::Environment::with_prefix("TRIEKV").separator("__"))
            .build();

        match settings {
            Ok(s) => s.try_deserialize().unwrap_or_default(),
            Err(_) => Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let broker = BrokerConfig::default();
        assert_eq!(broker.replication, 2);
        assert_eq!(broker.request_timeout(), Duration::from_secs(5));

        let node = NodeConfig::default();
        assert_eq!(node.bind_addr, "127.0.0.1:7000");
    }
}
