//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledgers.
//!
//! # Metrics
//!
//! - `ledger_mutations_total{operation}` - Committed mutations by operation
//! - `ledger_persist_duration_seconds` - Histogram of snapshot save latencies
//! - `ledger_persist_failures_total` - Saves that failed (mutation discarded)
//! - `ledger_tenants_loaded` - Ledgers held by the registry

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Committed mutations, labelled by operation
    pub mutations_total: IntCounterVec,

    /// Snapshot save duration histogram
    pub persist_duration: Histogram,

    /// Failed snapshot saves
    pub persist_failures: IntCounter,

    /// Loaded tenants
    pub tenants_loaded: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("persist_failures", &self.persist_failures.get())
            .field("tenants_loaded", &self.tenants_loaded.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let mutations_total = IntCounterVec::new(
            Opts::new("ledger_mutations_total", "Committed ledger mutations"),
            &["operation"],
        )?;
        registry.register(Box::new(mutations_total.clone()))?;

        let persist_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_persist_duration_seconds",
                "Histogram of snapshot save latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.0]),
        )?;
        registry.register(Box::new(persist_duration.clone()))?;

        let persist_failures = IntCounter::new(
            "ledger_persist_failures_total",
            "Snapshot saves that failed",
        )?;
        registry.register(Box::new(persist_failures.clone()))?;

        let tenants_loaded = IntGauge::new("ledger_tenants_loaded", "Ledgers held by the registry")?;
        registry.register(Box::new(tenants_loaded.clone()))?;

        Ok(Self {
            mutations_total,
            persist_duration,
            persist_failures,
            tenants_loaded,
            registry,
        })
    }

    /// Record a committed mutation
    pub fn record_mutation(&self, operation: &str) {
        self.mutations_total.with_label_values(&[operation]).inc();
    }

    /// Record snapshot save duration
    pub fn record_persist_duration(&self, duration_seconds: f64) {
        self.persist_duration.observe(duration_seconds);
    }

    /// Record a failed snapshot save
    pub fn record_persist_failure(&self) {
        self.persist_failures.inc();
    }

    /// Update loaded tenant count
    pub fn set_tenants_loaded(&self, count: usize) {
        self.tenants_loaded.set(count as i64);
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
