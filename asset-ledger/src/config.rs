//! Configuration for the ledger host

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// State backend
    pub storage: StorageKind,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Invocation actor configuration
    pub actor: ActorConfig,

    /// Seed data written by `InitLedger`
    pub bootstrap: BootstrapConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/ledger"),
            service_name: "asset-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            storage: StorageKind::RocksDB,
            rocksdb: RocksDBConfig::default(),
            actor: ActorConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

/// Which state backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Persistent RocksDB under `data_dir`
    RocksDB,
    /// Process-local map, lost on exit
    Memory,
}

impl StorageKind {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rocksdb" => Some(StorageKind::RocksDB),
            "memory" => Some(StorageKind::Memory),
            _ => None,
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Fsync every commit
    pub sync_writes: bool,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 2,
            max_background_jobs: 2,
            sync_writes: true,
            enable_statistics: false,
        }
    }
}

/// Invocation actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox capacity (invocations)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

/// One asset written by `InitLedger`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedAsset {
    /// Asset ID
    pub asset_id: String,
    /// Category
    pub asset_type: String,
    /// Price or balance
    pub price: Decimal,
    /// Owning principal
    pub owner: String,
}

impl SeedAsset {
    fn new(asset_id: &str, asset_type: &str, price: Decimal, owner: &str) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            asset_type: asset_type.to_string(),
            price,
            owner: owner.to_string(),
        }
    }
}

/// Bootstrap configuration
///
/// The default seeds are owned by bare labels (`A`, `B`, `bank`, `port`).
/// No caller resolves to a bare label, so those assets are read-only: update,
/// delete and transfer all fail the owner check. Set `bootstrap.assets` with
/// `name@org` owners for seeds that callers should be able to manage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Seed assets, created in order
    pub assets: Vec<SeedAsset>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        // 5000.0 etc. with one fractional digit
        let amount = |units: i64| Decimal::new(units * 10, 1);

        Self {
            assets: vec![
                SeedAsset::new("A-wallet", "money", amount(5000), "A"),
                SeedAsset::new("B-wallet", "money", amount(5000), "B"),
                SeedAsset::new("asset1", "water", amount(1000), "A"),
                SeedAsset::new("asset3", "medicine", amount(6000), "A"),
                SeedAsset::new("asset2", "clothes", amount(2000), "B"),
                SeedAsset::new("asset5", "glass", amount(4000), "bank"),
                SeedAsset::new("asset6", "desk", amount(3000), "port"),
            ],
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

        if let Ok(data_dir) = std::env::var("LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(storage) = std::env::var("LEDGER_STORAGE") {
            config.storage = StorageKind::from_str(&storage).ok_or_else(|| {
                crate::Error::Config(format!("Unknown storage backend: {}", storage))
            })?;
        }

        if let Ok(capacity) = std::env::var("LEDGER_MAILBOX") {
            config.actor.mailbox_capacity = capacity.parse().map_err(|_| {
                crate::Error::Config(format!("Invalid mailbox capacity: {}", capacity))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the host cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "actor.mailbox_capacity must be positive".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for seed in &self.bootstrap.assets {
            if seed.asset_id.is_empty() {
                return Err(crate::Error::Config("Seed asset with empty ID".to_string()));
            }
            if !seen.insert(seed.asset_id.as_str()) {
                return Err(crate::Error::Config(format!(
                    "Duplicate seed asset: {}",
                    seed.asset_id
                )));
            }
        }

        Ok(())
    }
}
