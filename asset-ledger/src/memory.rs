//! In-memory state backend
//!
//! Used for tests and for `storage = "memory"` deployments. A commit takes
//! the write lock once, so readers never observe half of a write set.

use crate::world_state::{in_range, StateBackend, WriteSet};
use crate::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Ordered map behind a lock
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed keys
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    /// Whether nothing has been committed
    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }
}

impl StateBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state.read().get(key).cloned())
    }

    fn scan(&self, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let state = self.state.read();
        let results = state
            .range(start.to_string()..)
            .take_while(|(k, _)| end.is_empty() || k.as_str() < end)
            .filter(|(k, _)| in_range(k, start, end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }

    fn commit(&self, writes: WriteSet) -> Result<()> {
        let mut state = self.state.write();
        for (key, value) in writes {
            match value {
                Some(bytes) => {
                    state.insert(key, bytes);
                }
                None => {
                    state.remove(&key);
                }
            }
        }
        Ok(())
    }
}
