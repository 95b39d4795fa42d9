//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `state` - World state (key: namespaced record key, value: record JSON)
//!
//! Every invocation's write set is applied with one `WriteBatch`, which is
//! what makes a multi-record transfer all-or-nothing.

use crate::{
    error::{Error, Result},
    world_state::{StateBackend, WriteSet},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch,
    WriteOptions, DB,
};
use std::sync::Arc;

/// Column family names
const CF_STATE: &str = "state";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    sync_writes: bool,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.db.path())
            .field("sync_writes", &self.sync_writes)
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(
            CF_STATE,
            Self::cf_options_state(),
        )];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB world state");

        Ok(Self {
            db: Arc::new(db),
            sync_writes: config.rocksdb.sync_writes,
        })
    }

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // State is frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_STATE)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_STATE)))
    }

    /// Approximate number of keys in the world state
    pub fn approximate_key_count(&self) -> Result<u64> {
        let cf = self.cf_handle()?;
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);
        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

impl StateBackend for Storage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle()?;
        Ok(self.db.get_cf(cf, key.as_bytes())?)
    }

    fn scan(&self, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let cf = self.cf_handle()?;

        let mode = if start.is_empty() {
            IteratorMode::Start
        } else {
            IteratorMode::From(start.as_bytes(), Direction::Forward)
        };

        let mut results = Vec::new();
        for item in self.db.iterator_cf(cf, mode) {
            let (key, value) = item?;
            let key = String::from_utf8(key.into_vec())
                .map_err(|e| Error::Storage(format!("Non UTF-8 key in world state: {}", e)))?;

            if !end.is_empty() && key.as_str() >= end {
                break;
            }
            results.push((key, value.into_vec()));
        }

        Ok(results)
    }

    fn commit(&self, writes: WriteSet) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let cf = self.cf_handle()?;
        let count = writes.len();

        let mut batch = WriteBatch::default();
        for (key, value) in writes {
            match value {
                Some(bytes) => batch.put_cf(cf, key.as_bytes(), &bytes),
                None => batch.delete_cf(cf, key.as_bytes()),
            }
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);

        // Atomic commit
        self.db.write_opt(batch, &write_opts)?;

        tracing::debug!(writes = count, "Write set committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_state::{TxState, WorldState};
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        config.rocksdb.sync_writes = false;
        (config, temp_dir)
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        assert!(storage.db.cf_handle(CF_STATE).is_some());
    }

    #[test]
    fn test_commit_and_get() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut tx = TxState::new(&storage);
        tx.put_state("asset:asset1", b"{}".to_vec()).unwrap();
        storage.commit(tx.into_write_set()).unwrap();

        assert_eq!(storage.get("asset:asset1").unwrap(), Some(b"{}".to_vec()));
        assert_eq!(storage.get("asset:missing").unwrap(), None);
    }

    #[test]
    fn test_scan_respects_bounds() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut tx = TxState::new(&storage);
        for key in ["asset:b", "asset:a", "order:x", "asset:c"] {
            tx.put_state(key, key.as_bytes().to_vec()).unwrap();
        }
        storage.commit(tx.into_write_set()).unwrap();

        let assets: Vec<String> = storage
            .scan("asset:", "asset;")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(assets, vec!["asset:a", "asset:b", "asset:c"]);

        let everything = storage.scan("", "").unwrap();
        assert_eq!(everything.len(), 4);
    }

    #[test]
    fn test_commit_deletes() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut tx = TxState::new(&storage);
        tx.put_state("asset:a", b"1".to_vec()).unwrap();
        storage.commit(tx.into_write_set()).unwrap();

        let mut tx = TxState::new(&storage);
        tx.del_state("asset:a").unwrap();
        storage.commit(tx.into_write_set()).unwrap();

        assert_eq!(storage.get("asset:a").unwrap(), None);
    }

    #[test]
    fn test_state_survives_reopen() {
        let (config, _temp) = test_config();
        {
            let storage = Storage::open(&config).unwrap();
            let mut tx = TxState::new(&storage);
            tx.put_state("asset:a", b"1".to_vec()).unwrap();
            storage.commit(tx.into_write_set()).unwrap();
            storage.close().unwrap();
        }

        let storage = Storage::open(&config).unwrap();
        assert_eq!(storage.get("asset:a").unwrap(), Some(b"1".to_vec()));
    }
}
