use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

/// Chain RPC connection and batching configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct RpcSettings {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Blocks fetched concurrently per source within one epoch
    #[serde(default = "default_block_concurrency")]
    pub block_concurrency: usize,
    /// Capacity of the per-block result cache
    #[serde(default = "default_block_cache_capacity")]
    pub block_cache_capacity: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_block_concurrency() -> usize {
    16
}

fn default_block_cache_capacity() -> u64 {
    100_000
}

/// Monitored contracts.
///
/// - `pairs`: AMM pairs snapshotted for reserves
/// - `assets`: lending assets snapshotted for supply/debt and rolled into market stats
/// - `tracked_wallets`: addresses reported by the single-block interaction processor
#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    #[serde(default)]
    pub pairs: Vec<String>,
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub stablecoins: Vec<String>,
    #[serde(default)]
    pub tracked_wallets: Vec<String>,
    #[serde(default = "default_pool_data_provider")]
    pub pool_data_provider: String,
    #[serde(default = "default_price_oracle")]
    pub price_oracle: String,
}

fn default_pool_data_provider() -> String {
    // Aave V3 Ethereum PoolDataProvider
    "0x7B4EB56E7CD4b454BA8ff71E4518426369a138a3".to_string()
}

fn default_price_oracle() -> String {
    // Aave V3 Ethereum AaveOracle
    "0x54586bE62E3c3580375aE3723C145253060Ca0C2".to_string()
}

/// Epoch release configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct EpochSettings {
    /// Maximum number of blocks per epoch
    #[serde(default = "default_epoch_size")]
    pub size: u64,
    #[serde(default = "default_epoch_interval_secs")]
    pub interval_secs: u64,
    /// First block of the first epoch; defaults to the chain head window
    #[serde(default)]
    pub start_block: Option<u64>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_epoch_size() -> u64 {
    10
}

fn default_epoch_interval_secs() -> u64 {
    120
}

fn default_namespace() -> String {
    "mainnet".to_string()
}

/// Snapshot storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    #[serde(default = "default_storage_dir")]
    pub dir: String,
    #[serde(default = "default_read_cache_capacity")]
    pub read_cache_capacity: u64,
}

fn default_storage_dir() -> String {
    "./snapshots".to_string()
}

fn default_read_cache_capacity() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            read_cache_capacity: default_read_cache_capacity(),
        }
    }
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub rpc: RpcSettings,
    pub sources: SourceSettings,
    pub epochs: EpochSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        s.try_deserialize()
    }

    /// Parse settings from an in-memory YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Yaml))
            .build()?;

        s.try_deserialize()
    }
}
