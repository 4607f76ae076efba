//! Configuration for the marketplace ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Metrics listen address
    pub metrics_listen_addr: String,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,

    /// Market rules configuration
    pub market: MarketConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/market"),
            service_name: "parcel-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            metrics_listen_addr: "0.0.0.0:9090".to_string(),
            rocksdb: RocksDbConfig::default(),
            market: MarketConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
        }
    }
}

/// Market rules fixed at deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Minimum listing price (positive integer value)
    pub min_price: u64,

    /// Advisory maximum listing duration in seconds
    ///
    /// Not enforced by the engine; published for client-side convenience.
    pub max_listing_duration_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            min_price: 1_000_000, // 0.001 in 9-decimal base units
            max_listing_duration_secs: 90 * 24 * 60 * 60,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("MARKET_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(addr) = std::env::var("MARKET_METRICS_ADDR") {
            config.metrics_listen_addr = addr;
        }

        if let Ok(min_price) = std::env::var("MARKET_MIN_PRICE") {
            config.market.min_price = min_price
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid MARKET_MIN_PRICE: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check deployment constants
    pub fn validate(&self) -> crate::Result<()> {
        if self.market.min_price == 0 {
            return Err(crate::Error::Config(
                "market.min_price must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
