//! Core Metrics
//!
//! Prometheus instrumentation for the transaction pipeline. A single
//! `CoreMetrics` value is registered against a `prometheus::Registry` at
//! startup and shared behind an `Arc` by the verifier and state mutator.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

/// Counters and histograms for the transaction core
#[derive(Debug)]
pub struct CoreMetrics {
    verifications_total: IntCounter,
    verification_failures: IntCounterVec,
    verification_seconds: Histogram,
    applied_total: IntCounter,
    undone_total: IntCounter,
    balance_rollbacks_total: IntCounter,
}

impl CoreMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let verifications_total = IntCounter::with_opts(Opts::new(
            "transaction_verifications_total",
            "Total number of transaction verifications attempted",
        ))?;
        let verification_failures = IntCounterVec::new(
            Opts::new(
                "transaction_verification_failures_total",
                "Transaction verification failures by reason",
            ),
            &["reason"],
        )?;
        let verification_seconds = Histogram::with_opts(HistogramOpts::new(
            "transaction_verification_seconds",
            "Wall-clock duration of transaction verification",
        ))?;
        let applied_total = IntCounter::with_opts(Opts::new(
            "transactions_applied_total",
            "Transactions applied to confirmed state",
        ))?;
        let undone_total = IntCounter::with_opts(Opts::new(
            "transactions_undone_total",
            "Transactions undone from confirmed state",
        ))?;
        let balance_rollbacks_total = IntCounter::with_opts(Opts::new(
            "transaction_balance_rollbacks_total",
            "Compensating balance rollbacks after handler failures",
        ))?;

        registry.register(Box::new(verifications_total.clone()))?;
        registry.register(Box::new(verification_failures.clone()))?;
        registry.register(Box::new(verification_seconds.clone()))?;
        registry.register(Box::new(applied_total.clone()))?;
        registry.register(Box::new(undone_total.clone()))?;
        registry.register(Box::new(balance_rollbacks_total.clone()))?;

        Ok(Self {
            verifications_total,
            verification_failures,
            verification_seconds,
            applied_total,
            undone_total,
            balance_rollbacks_total,
        })
    }

    pub fn increment_verifications(&self) {
        self.verifications_total.inc();
    }

    pub fn increment_verification_failure(&self, reason: &str) {
        self.verification_failures.with_label_values(&[reason]).inc();
    }

    pub fn observe_verification(&self, seconds: f64) {
        self.verification_seconds.observe(seconds);
    }

    pub fn increment_applied(&self) {
        self.applied_total.inc();
    }

    pub fn increment_undone(&self) {
        self.undone_total.inc();
    }

    pub fn increment_balance_rollbacks(&self) {
        self.balance_rollbacks_total.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_once() {
        let registry = Registry::new();
        let metrics = CoreMetrics::new(&registry).unwrap();

        metrics.increment_verifications();
        metrics.increment_verification_failure("invalid_fee");
        metrics.increment_verification_failure("invalid_fee");
        metrics.observe_verification(0.002);
        metrics.increment_balance_rollbacks();

        // Registering the same metric names twice must fail
        assert!(CoreMetrics::new(&registry).is_err());
    }
}
