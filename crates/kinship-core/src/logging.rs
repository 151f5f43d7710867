use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Cache and work counters for one engine instance.
///
/// Tracks score-cache and fingerprint-cache hit/miss statistics plus image
/// failures. All operations are atomic and lock-free so rayon workers can
/// record into the same instance.
#[derive(Debug, Default)]
pub struct ResourceMetrics {
    score_hits: AtomicU64,
    score_misses: AtomicU64,
    fingerprint_hits: AtomicU64,
    fingerprint_misses: AtomicU64,
    image_failures: AtomicU64,
}

impl ResourceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_score_hit(&self) {
        self.score_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_score_miss(&self) {
        self.score_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fingerprint_hit(&self) {
        self.fingerprint_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fingerprint_miss(&self) {
        self.fingerprint_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_image_failure(&self) {
        self.image_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn score_hits(&self) -> u64 {
        self.score_hits.load(Ordering::Relaxed)
    }

    pub fn score_misses(&self) -> u64 {
        self.score_misses.load(Ordering::Relaxed)
    }

    pub fn fingerprint_hits(&self) -> u64 {
        self.fingerprint_hits.load(Ordering::Relaxed)
    }

    pub fn fingerprint_misses(&self) -> u64 {
        self.fingerprint_misses.load(Ordering::Relaxed)
    }

    pub fn image_failures(&self) -> u64 {
        self.image_failures.load(Ordering::Relaxed)
    }

    /// Score cache hit rate as a percentage (0.0-100.0)
    pub fn score_hit_rate(&self) -> f64 {
        let hits = self.score_hits();
        let total = hits + self.score_misses();
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.score_hits.store(0, Ordering::Relaxed);
        self.score_misses.store(0, Ordering::Relaxed);
        self.fingerprint_hits.store(0, Ordering::Relaxed);
        self.fingerprint_misses.store(0, Ordering::Relaxed);
        self.image_failures.store(0, Ordering::Relaxed);
    }
}

/// Log resource metrics at debug level.
///
/// Usage:
/// ```rust,ignore
/// log_resource_metrics!(engine.metrics(), "graph_build");
/// ```
#[macro_export]
macro_rules! log_resource_metrics {
    ($metrics:expr, $name:expr) => {
        tracing::debug!(
            operation = $name,
            score_hits = $metrics.score_hits(),
            score_misses = $metrics.score_misses(),
            score_hit_rate = $metrics.score_hit_rate(),
            fingerprint_hits = $metrics.fingerprint_hits(),
            fingerprint_misses = $metrics.fingerprint_misses(),
            image_failures = $metrics.image_failures(),
            "resource_metrics"
        );
    };
}

/// Helper macro for logging elapsed time at trace level.
///
/// Usage:
/// ```rust,ignore
/// let start = Instant::now();
/// // ... some work ...
/// trace_time!(start, "fingerprint_images");
/// trace_time!(start, "evaluate_pairs", pairs = pairs.len());
/// ```
#[macro_export]
macro_rules! trace_time {
    ($start:expr, $name:expr) => {
        tracing::trace!(elapsed = ?$start.elapsed(), $name);
    };
    ($start:expr, $name:expr $(, $field:ident = $value:expr)*) => {
        tracing::trace!(elapsed = ?$start.elapsed(), $($field = $value),*, $name);
    };
}

/// Initialize structured logging based on CLI arguments
pub fn init_tracing(
    verbose: bool,
    log_level: Option<&str>,
    log_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let level = match (verbose, log_level) {
        (true, None) => "kinship=debug,kinship_core=debug",
        (false, None) => "kinship=warn,kinship_core=warn",
        (_, Some(level)) => return init_with_level(level, log_json),
    };

    init_with_level(level, log_json)
}

fn init_with_level(level: &str, log_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    // KINSHIP_LOG takes the same syntax as RUST_LOG
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("KINSHIP_LOG"))
        .unwrap_or_else(|_| {
            EnvFilter::new(if level.contains('=') {
                level.to_string()
            } else {
                format!("kinship={},kinship_core={}", level, level)
            })
        });

    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_span_events(
                        tracing_subscriber::fmt::format::FmtSpan::NEW
                            | tracing_subscriber::fmt::format::FmtSpan::CLOSE,
                    ),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        let metrics = ResourceMetrics::new();
        assert_eq!(metrics.score_hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_and_reset() {
        let metrics = ResourceMetrics::new();
        metrics.record_score_hit();
        metrics.record_score_hit();
        metrics.record_score_hit();
        metrics.record_score_miss();
        metrics.record_image_failure();
        assert_eq!(metrics.score_hit_rate(), 75.0);
        assert_eq!(metrics.image_failures(), 1);

        metrics.reset();
        assert_eq!(metrics.score_hits(), 0);
        assert_eq!(metrics.image_failures(), 0);
    }
}
