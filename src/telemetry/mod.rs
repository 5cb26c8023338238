//! Logging and evaluation counters.
//!
//! Structured logs go through `tracing`; [`init_logging`] installs a
//! `tracing-subscriber` formatter for binaries and tests that want output.
//! [`Telemetry`] keeps cheap in-process counters for evaluation results.

use crate::config::TelemetryConfig;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured log level.
pub fn init_logging(config: &TelemetryConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config_key(format!("Invalid log level: {}", e), "telemetry.log_level"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::internal(format!("Failed to set logging subscriber: {}", e)))?;
    tracing::info!(service = %config.service_name, "logging initialized");
    Ok(())
}

/// Evaluation counters.
#[derive(Default)]
pub struct Telemetry {
    evaluations_active: AtomicU64,
    evaluations_inactive: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    gate_overrides: AtomicU64,
    errors: AtomicU64,
    /// Total evaluation time in microseconds
    total_evaluation_time_us: AtomicU64,
}

impl Telemetry {
    /// Create a new telemetry instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a flag evaluation.
    ///
    /// `cached` is `Some(hit)` when the evaluation went through a cache and
    /// `None` when caching is disabled, which leaves the hit rate untouched.
    pub fn record_evaluation(&self, active: bool, duration_ms: f64, cached: Option<bool>) {
        if active {
            self.evaluations_active.fetch_add(1, Ordering::Relaxed);
        } else {
            self.evaluations_inactive.fetch_add(1, Ordering::Relaxed);
        }

        match cached {
            Some(true) => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
            Some(false) => {
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
            }
            None => {}
        }

        let duration_us = (duration_ms * 1000.0) as u64;
        self.total_evaluation_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Record an expired flag decided by the expiration gate.
    pub fn record_gate_override(&self) {
        self.gate_overrides.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed evaluation.
    pub fn record_error(&self, error: &Error) {
        tracing::debug!(category = error.category(), "evaluation error recorded");
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics.
    pub fn metrics(&self) -> TelemetryMetrics {
        let evaluations_active = self.evaluations_active.load(Ordering::Relaxed);
        let evaluations_inactive = self.evaluations_inactive.load(Ordering::Relaxed);
        let total_evaluations = evaluations_active + evaluations_inactive;

        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let cache_total = cache_hits + cache_misses;
        let cache_hit_rate = if cache_total > 0 {
            (cache_hits as f64 / cache_total as f64) * 100.0
        } else {
            0.0
        };

        let total_time_us = self.total_evaluation_time_us.load(Ordering::Relaxed);
        let avg_evaluation_time_ms = if total_evaluations > 0 {
            (total_time_us as f64 / total_evaluations as f64) / 1000.0
        } else {
            0.0
        };

        TelemetryMetrics {
            total_evaluations,
            evaluations_active,
            evaluations_inactive,
            cache_hits,
            cache_misses,
            cache_hit_rate,
            gate_overrides: self.gate_overrides.load(Ordering::Relaxed),
            avg_evaluation_time_ms,
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics collected by telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryMetrics {
    /// Total number of evaluations
    pub total_evaluations: u64,
    /// Evaluations that returned active
    pub evaluations_active: u64,
    /// Evaluations that returned inactive
    pub evaluations_inactive: u64,
    /// Cache hits
    pub cache_hits: u64,
    /// Cache misses
    pub cache_misses: u64,
    /// Cache hit rate percentage
    pub cache_hit_rate: f64,
    /// Expired flags decided by the expiration gate
    pub gate_overrides: u64,
    /// Average evaluation time in milliseconds
    pub avg_evaluation_time_ms: f64,
    /// Total errors
    pub errors: u64,
}
