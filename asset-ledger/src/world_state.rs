//! World-state access for a single invocation
//!
//! [`WorldState`] is the key-value surface contract code is written
//! against. [`StateBackend`] is the committed store underneath it, and
//! [`TxState`] buffers one invocation's writes on top of a backend so the
//! host can commit them as a single unit or drop them.
//!
//! # Key layout
//!
//! ```text
//! asset:<assetID>   -> Asset JSON
//! order:<orderId>   -> Order JSON
//! ```
//!
//! Range bounds are lexical: `start` inclusive, `end` exclusive, and an
//! empty bound means unbounded on that side.

use crate::Result;
use std::collections::BTreeMap;

/// Key-value view of the ledger available to an invocation
pub trait WorldState {
    /// Read the value under `key`
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write `value` under `key`
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove `key`
    fn del_state(&mut self, key: &str) -> Result<()>;

    /// Lexically ordered scan of `[start, end)`
    fn get_state_by_range(&self, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>>;
}

/// Committed state store
pub trait StateBackend: Send + Sync {
    /// Read committed value
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Lexically ordered scan of committed values in `[start, end)`
    fn scan(&self, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Apply every write of the set, all or nothing
    fn commit(&self, writes: WriteSet) -> Result<()>;
}

/// Record namespace inside the flat key space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Assets and wallets
    Asset,
    /// Purchase orders
    Order,
}

impl Namespace {
    fn prefix(&self) -> &'static str {
        match self {
            Namespace::Asset => "asset:",
            Namespace::Order => "order:",
        }
    }

    /// Storage key for a record ID
    pub fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix(), id)
    }

    /// Record ID of a storage key, if the key belongs to this namespace
    pub fn strip<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.prefix())
    }

    /// Range covering exactly this namespace
    ///
    /// The end bound is the prefix with its trailing `:` bumped to `;`.
    pub fn range(&self) -> (&'static str, &'static str) {
        match self {
            Namespace::Asset => ("asset:", "asset;"),
            Namespace::Order => ("order:", "order;"),
        }
    }
}

/// Whether `key` falls in `[start, end)` with empty bounds unbounded
pub fn in_range(key: &str, start: &str, end: &str) -> bool {
    (start.is_empty() || key >= start) && (end.is_empty() || key < end)
}

/// Buffered writes of one invocation; `None` marks a delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    entries: BTreeMap<String, Option<Vec<u8>>>,
}

impl WriteSet {
    /// Number of buffered writes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffered writes in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&[u8]>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    fn pending(&self, key: &str) -> Option<&Option<Vec<u8>>> {
        self.entries.get(key)
    }

    fn put(&mut self, key: &str, value: Vec<u8>) {
        self.entries.insert(key.to_string(), Some(value));
    }

    fn delete(&mut self, key: &str) {
        self.entries.insert(key.to_string(), None);
    }
}

impl IntoIterator for WriteSet {
    type Item = (String, Option<Vec<u8>>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Option<Vec<u8>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// One invocation's view: committed state plus its own pending writes
pub struct TxState<'a> {
    backend: &'a dyn StateBackend,
    writes: WriteSet,
}

impl<'a> TxState<'a> {
    /// Start an invocation on top of `backend`
    pub fn new(backend: &'a dyn StateBackend) -> Self {
        Self {
            backend,
            writes: WriteSet::default(),
        }
    }

    /// Finish the invocation, handing back its writes for commit
    pub fn into_write_set(self) -> WriteSet {
        self.writes
    }
}

impl std::fmt::Debug for TxState<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxState")
            .field("pending_writes", &self.writes.len())
            .finish()
    }
}

impl WorldState for TxState<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.writes.pending(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.backend.get(key),
        }
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        tracing::debug!(key, bytes = value.len(), "put_state");
        self.writes.put(key, value);
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<()> {
        tracing::debug!(key, "del_state");
        self.writes.delete(key);
        Ok(())
    }

    fn get_state_by_range(&self, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mut merged: BTreeMap<String, Vec<u8>> =
            self.backend.scan(start, end)?.into_iter().collect();

        for (key, value) in self.writes.iter() {
            if !in_range(key, start, end) {
                continue;
            }
            match value {
                Some(bytes) => {
                    merged.insert(key.to_string(), bytes.to_vec());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}
