//! Asset Ledger
//!
//! State-transition core for a permissioned asset ledger: assets, wallets
//! and purchase orders stored as JSON records in a key-value world state.
//!
//! # Architecture
//!
//! - **Contract**: Twelve named operations dispatched from an explicit table
//! - **World State**: Per-invocation overlay with read-your-writes
//! - **Single Writer**: One actor runs invocations and commits write sets
//! - **Backends**: RocksDB for persistence, in-memory map for tests
//!
//! # Invariants
//!
//! - A wallet is the asset `<principal>-wallet`; its price is the balance
//! - A failed invocation commits nothing
//! - Assets and orders live in separate key namespaces
//! - Orders are confirmed at most once

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod assets;
pub mod auth;
pub mod config;
pub mod contract;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod orders;
pub mod registry;
pub mod storage;
pub mod transfer;
pub mod types;
pub mod world_state;

// Re-exports
pub use config::Config;
pub use contract::{AssetTransfer, Context, ContractInfo, Invocation};
pub use error::{Error, RecordKind, Result};
pub use identity::{IdentityResolver, Principal};
pub use ledger::Ledger;
pub use memory::MemoryStorage;
pub use registry::{Contract, Intent, Registry};
pub use storage::Storage;
pub use transfer::{TransferEngine, TransferSummary, WalletBalance};
pub use types::{wallet_id, Asset, Order};
pub use world_state::{StateBackend, TxState, WorldState, WriteSet};
