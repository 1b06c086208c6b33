use serde::{Deserialize, Serialize};

use crate::services::index_poller::PollPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub relay: RelayConfig,
    pub chain: ChainConfig,
    pub wallet: WalletConfig,
    pub indexer: IndexerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub graphql_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub hub_contract: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub poll_interval_ms: u64,
    /// Zero disables the attempt cap.
    pub max_attempts: u32,
    /// Zero disables the wall-clock limit.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::new(config_path, config::FileFormat::Toml).required(false))
            .add_source(config::Environment::with_prefix("SOCIAL_RELAY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_graphql_url(&self) -> &str {
        &self.relay.graphql_url
    }

    pub fn get_request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.relay.request_timeout_secs)
    }

    pub fn get_poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: tokio::time::Duration::from_millis(self.indexer.poll_interval_ms),
            max_attempts: (self.indexer.max_attempts > 0).then_some(self.indexer.max_attempts),
            timeout: (self.indexer.timeout_secs > 0)
                .then(|| tokio::time::Duration::from_secs(self.indexer.timeout_secs)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay: RelayConfig {
                graphql_url: "https://api-mumbai.lens.dev".to_string(),
                request_timeout_secs: 30,
            },
            chain: ChainConfig {
                rpc_url: "https://rpc-mumbai.maticvigil.com".to_string(),
                hub_contract: "0x60Ae865ee4C725cd04353b5AAb364553f56ceF82".to_string(),
            },
            wallet: WalletConfig {
                private_key: String::new(),
            },
            indexer: IndexerConfig {
                poll_interval_ms: 500,
                max_attempts: 240,
                timeout_secs: 180,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}
