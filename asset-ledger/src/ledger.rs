//! Main ledger orchestration layer
//!
//! Ties together the state backend, the contract and the actor into a
//! high-level API for submitting and evaluating operations.
//!
//! # Example
//!
//! ```no_run
//! use asset_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> asset_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default()).await?;
//!
//!     let caller = "x509::CN=alice::CN=ca.org1.example.com, O=org1.example.com";
//!     ledger.submit(caller, "InitLedger", vec![]).await?;
//!     let asset = ledger.evaluate(caller, "ReadAsset", vec!["asset1".into()]).await?;
//!     println!("{}", asset);
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    config::StorageKind,
    contract::Invocation,
    memory::MemoryStorage,
    metrics::Metrics,
    registry::{Contract, Intent, Registry},
    world_state::StateBackend,
    Config, Error, Result, Storage,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Actor handle for invocations
    handle: LedgerHandle,

    /// Actor task; owns the backend until it finishes
    actor: JoinHandle<()>,

    /// Operation table (read-only here)
    contract: Arc<Contract>,

    /// Metrics shared with the actor
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let backend: Arc<dyn StateBackend> = match config.storage {
            StorageKind::RocksDB => {
                let storage = Storage::open(&config)?;
                tracing::info!(
                    path = %config.data_dir.display(),
                    keys = storage.approximate_key_count()?,
                    "State store opened"
                );
                Arc::new(storage)
            }
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
        };

        Self::with_backend(config, backend)
    }

    /// Open ledger over an existing backend
    pub fn with_backend(config: Config, backend: Arc<dyn StateBackend>) -> Result<Self> {
        config.validate()?;

        let contract = Arc::new(Contract::new(config.bootstrap.assets.clone())?);
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;

        let (handle, actor) = spawn_ledger_actor(
            backend,
            contract.clone(),
            metrics.clone(),
            config.actor.mailbox_capacity,
        );

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            storage = ?config.storage,
            operations = contract.registry().len(),
            "Ledger opened"
        );

        Ok(Self {
            handle,
            actor,
            contract,
            metrics,
            config,
        })
    }

    /// Run an operation and commit its writes on success
    pub async fn submit(
        &self,
        caller: &str,
        operation: &str,
        args: Vec<String>,
    ) -> Result<String> {
        self.invoke(Intent::Submit, caller, operation, args).await
    }

    /// Run an operation without committing anything
    pub async fn evaluate(
        &self,
        caller: &str,
        operation: &str,
        args: Vec<String>,
    ) -> Result<String> {
        self.invoke(Intent::Evaluate, caller, operation, args).await
    }

    async fn invoke(
        &self,
        mode: Intent,
        caller: &str,
        operation: &str,
        args: Vec<String>,
    ) -> Result<String> {
        let invocation = Invocation::new(caller);
        tracing::debug!(
            operation,
            tx_id = %invocation.tx_id,
            mode = ?mode,
            "Invoking"
        );

        self.handle.invoke(mode, invocation, operation, args).await
    }

    /// Registered operations
    pub fn operations(&self) -> &Registry {
        self.contract.registry()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the actor after queued invocations finish
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await?;
        self.actor
            .await
            .map_err(|e| Error::Concurrency(format!("Actor task failed: {}", e)))?;
        tracing::info!("Ledger shut down");
        Ok(())
    }
}
