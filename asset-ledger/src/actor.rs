//! Actor-based concurrency for the ledger
//!
//! Invocations run on one Tokio task that owns the write path:
//! - One writer means no two invocations interleave their reads and writes
//! - Each invocation runs against its own [`TxState`] overlay
//! - A successful submit commits its write set atomically; anything else
//!   drops it
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends invocations to actor mailbox            │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   TxState ─▶ Contract::invoke ─▶ WriteSet            │
//! │                       │                               │
//! │                       ▼                               │
//! │           StateBackend::commit()                      │
//! │        (one WriteBatch / one write lock)              │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::contract::{Context, Invocation};
use crate::metrics::{Metrics, OUTCOME_OK};
use crate::registry::{Contract, Intent};
use crate::world_state::{StateBackend, TxState};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Run one operation
    Invoke {
        /// Submit commits writes, evaluate never does
        mode: Intent,
        /// Caller and transaction
        invocation: Invocation,
        /// Operation name
        operation: String,
        /// Positional arguments
        args: Vec<String>,
        /// JSON response or error
        response: oneshot::Sender<Result<String>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    /// State backend
    backend: Arc<dyn StateBackend>,

    /// Operation table and logic
    contract: Arc<Contract>,

    /// Invocation and commit metrics
    metrics: Metrics,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl std::fmt::Debug for LedgerActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerActor")
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        backend: Arc<dyn StateBackend>,
        contract: Arc<Contract>,
        metrics: Metrics,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        Self {
            backend,
            contract,
            metrics,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Invoke {
                    mode,
                    invocation,
                    operation,
                    args,
                    response,
                } => {
                    let result = self.handle_invoke(mode, &invocation, &operation, &args);
                    let _ = response.send(result);
                }
                LedgerMessage::Shutdown => {
                    tracing::info!("Ledger actor shutting down");
                    break;
                }
            }
        }
    }

    /// Run one invocation and record its outcome
    fn handle_invoke(
        &self,
        mode: Intent,
        invocation: &Invocation,
        operation: &str,
        args: &[String],
    ) -> Result<String> {
        let started = Instant::now();
        let result = self.execute(mode, invocation, operation, args);
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(_) => {
                self.metrics.record_invocation(operation, OUTCOME_OK, elapsed);
            }
            Err(e) => {
                tracing::warn!(
                    operation,
                    tx_id = %invocation.tx_id,
                    code = e.code(),
                    "Invocation rejected: {}",
                    e
                );
                self.metrics.record_invocation(operation, e.code(), elapsed);
            }
        }

        result
    }

    fn execute(
        &self,
        mode: Intent,
        invocation: &Invocation,
        operation: &str,
        args: &[String],
    ) -> Result<String> {
        let commit = mode == Intent::Submit && self.contract.intent(operation)? == Intent::Submit;

        let mut state = TxState::new(self.backend.as_ref());
        let response = {
            let mut ctx = Context::new(&mut state, invocation);
            self.contract.invoke(&mut ctx, operation, args)?
        };

        let writes = state.into_write_set();
        if !commit {
            tracing::debug!(operation, discarded = writes.len(), "Evaluate finished");
            return Ok(response);
        }

        let count = writes.len();
        if count > 0 {
            self.backend.commit(writes)?;
            self.metrics.record_commit(count);
        }
        tracing::debug!(operation, tx_id = %invocation.tx_id, writes = count, "Committed");

        Ok(response)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Run an operation on the actor
    pub async fn invoke(
        &self,
        mode: Intent,
        invocation: Invocation,
        operation: impl Into<String>,
        args: Vec<String>,
    ) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Invoke {
                mode,
                invocation,
                operation: operation.into(),
                args,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    ///
    /// Invocations already queued are processed first.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
///
/// The returned task finishes once the actor has stopped and released the
/// backend.
pub fn spawn_ledger_actor(
    backend: Arc<dyn StateBackend>,
    contract: Arc<Contract>,
    metrics: Metrics,
    mailbox_capacity: usize,
) -> (LedgerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let actor = LedgerActor::new(backend, contract, metrics, rx);

    let task = tokio::spawn(async move {
        actor.run().await;
    });

    (LedgerHandle::new(tx), task)
}
