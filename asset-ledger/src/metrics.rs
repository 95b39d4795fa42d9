//! Metrics collection for observability
//!
//! Prometheus metrics for monitoring invocations and commits.
//!
//! # Metrics
//!
//! - `ledger_invocations_total{operation,outcome}` - Invocations by result
//! - `ledger_invocation_duration_seconds{operation}` - Invocation latency
//! - `ledger_commits_total` - Write sets committed
//! - `ledger_committed_writes_total` - Keys written or deleted by commits

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Outcome label for a successful invocation
pub const OUTCOME_OK: &str = "ok";

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Invocations by operation and outcome (`ok` or an error code)
    pub invocations_total: IntCounterVec,

    /// Invocation duration histogram
    pub invocation_duration: HistogramVec,

    /// Write sets committed
    pub commits_total: IntCounter,

    /// Keys touched by committed write sets
    pub committed_writes_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("commits_total", &self.commits_total.get())
            .field("committed_writes_total", &self.committed_writes_total.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let invocations_total = IntCounterVec::new(
            Opts::new("ledger_invocations_total", "Total number of invocations"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(invocations_total.clone()))?;

        let invocation_duration = HistogramVec::new(
            HistogramOpts::new(
                "ledger_invocation_duration_seconds",
                "Histogram of invocation latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.0]),
            &["operation"],
        )?;
        registry.register(Box::new(invocation_duration.clone()))?;

        let commits_total = IntCounter::new("ledger_commits_total", "Total number of commits")?;
        registry.register(Box::new(commits_total.clone()))?;

        let committed_writes_total = IntCounter::new(
            "ledger_committed_writes_total",
            "Total number of keys written or deleted by commits",
        )?;
        registry.register(Box::new(committed_writes_total.clone()))?;

        Ok(Self {
            invocations_total,
            invocation_duration,
            commits_total,
            committed_writes_total,
            registry,
        })
    }

    /// Record one finished invocation
    pub fn record_invocation(&self, operation: &str, outcome: &str, duration_seconds: f64) {
        self.invocations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.invocation_duration
            .with_label_values(&[operation])
            .observe(duration_seconds);
    }

    /// Record a committed write set
    pub fn record_commit(&self, writes: usize) {
        self.commits_total.inc();
        self.committed_writes_total.inc_by(writes as u64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
