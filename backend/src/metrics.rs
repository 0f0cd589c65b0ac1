use actix_web::{get, HttpResponse};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Global metrics registry
static REGISTRY: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

/// Global metrics instance, registered on first use
static METRICS: Lazy<Option<Arc<Metrics>>> = Lazy::new(|| match Metrics::new(&REGISTRY) {
    Ok(metrics) => Some(Arc::new(metrics)),
    Err(e) => {
        log::error!("Failed to register metrics: {}", e);
        None
    }
});

/// HTTP request metrics
pub struct HttpMetrics {
    /// Request duration histogram (in seconds)
    pub request_duration: HistogramVec,
    /// Total HTTP requests counter
    pub requests_total: IntCounterVec,
    /// Active requests gauge
    pub requests_in_flight: IntGauge,
}

/// Reaction batcher metrics
pub struct ReactionMetrics {
    pub flushes_total: IntCounterVec,
    pub rows_written: IntCounter,
    pub rows_removed: IntCounter,
    /// Entries whose stored set already matched
    pub rows_skipped: IntCounter,
    pub rows_failed: IntCounter,
    pub pending: IntGauge,
}

/// Object storage metrics
pub struct StorageMetrics {
    pub operations_total: IntCounterVec,
}

/// All application metrics
pub struct Metrics {
    pub http: HttpMetrics,
    pub reactions: ReactionMetrics,
    pub storage: StorageMetrics,
}

fn opts(name: &str, help: &str, subsystem: &str) -> Opts {
    Opts::new(name, help).namespace("dance").subsystem(subsystem)
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let counter = IntCounter::with_opts(opts(name, help, "reactions"))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    /// Create all metrics and register them with `registry`
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        // HTTP metrics
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .namespace("dance")
            .subsystem("http"),
            &["method", "endpoint", "status_code"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let requests_total = IntCounterVec::new(
            opts("http_requests_total", "Total number of HTTP requests", "http"),
            &["method", "endpoint", "status_code"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let requests_in_flight = IntGauge::with_opts(opts(
            "http_requests_in_flight",
            "Number of HTTP requests currently being processed",
            "http",
        ))?;
        registry.register(Box::new(requests_in_flight.clone()))?;

        // Reaction metrics
        let flushes_total = IntCounterVec::new(
            opts("flushes_total", "Reaction batch flushes by trigger", "reactions"),
            &["trigger"],
        )?;
        registry.register(Box::new(flushes_total.clone()))?;

        let pending = IntGauge::with_opts(opts(
            "pending",
            "Reaction sets waiting to be flushed",
            "reactions",
        ))?;
        registry.register(Box::new(pending.clone()))?;

        // Storage metrics
        let operations_total = IntCounterVec::new(
            opts("operations_total", "Object storage operations", "storage"),
            &["operation", "status"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        Ok(Metrics {
            http: HttpMetrics {
                request_duration,
                requests_total,
                requests_in_flight,
            },
            reactions: ReactionMetrics {
                flushes_total,
                rows_written: counter(registry, "rows_written_total", "Reaction rows upserted")?,
                rows_removed: counter(registry, "rows_removed_total", "Reaction rows removed")?,
                rows_skipped: counter(
                    registry,
                    "rows_skipped_total",
                    "Pending reaction sets equal to the stored row",
                )?,
                rows_failed: counter(registry, "rows_failed_total", "Reaction writes that failed")?,
                pending,
            },
            storage: StorageMetrics { operations_total },
        })
    }

    /// Get the Prometheus registry
    pub fn registry() -> Arc<Registry> {
        REGISTRY.clone()
    }

    /// Get the global metrics instance (None if registration failed)
    pub fn global() -> Option<Arc<Metrics>> {
        METRICS.clone()
    }
}

/// Helper function to record HTTP request metrics
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let Some(metrics) = Metrics::global() else {
        return;
    };
    let status_str = status_code.to_string();

    metrics
        .http
        .request_duration
        .with_label_values(&[method, endpoint, &status_str])
        .observe(duration.as_secs_f64());

    metrics
        .http
        .requests_total
        .with_label_values(&[method, endpoint, &status_str])
        .inc();
}

/// Outcome counts of one reaction flush
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    pub written: u64,
    pub removed: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Helper function to record a reaction flush
pub fn record_reaction_flush(trigger: &str, stats: FlushStats, pending_after: usize) {
    let Some(metrics) = Metrics::global() else {
        return;
    };
    let reactions = &metrics.reactions;
    reactions.flushes_total.with_label_values(&[trigger]).inc();
    reactions.rows_written.inc_by(stats.written);
    reactions.rows_removed.inc_by(stats.removed);
    reactions.rows_skipped.inc_by(stats.skipped);
    reactions.rows_failed.inc_by(stats.failed);
    reactions.pending.set(pending_after as i64);
}

pub fn record_reactions_pending(pending: usize) {
    if let Some(metrics) = Metrics::global() {
        metrics.reactions.pending.set(pending as i64);
    }
}

/// Helper function to record an object storage operation
pub fn record_storage_operation(operation: &str, ok: bool) {
    if let Some(metrics) = Metrics::global() {
        let status = if ok { "ok" } else { "error" };
        metrics
            .storage
            .operations_total
            .with_label_values(&[operation, status])
            .inc();
    }
}

/// Prometheus text exposition of every registered metric
#[get("/metrics")]
pub async fn metrics_handler() -> HttpResponse {
    // Touch the global so metrics exist even before the first request
    let _ = Metrics::global();

    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    match encoder.encode(&families, &mut buffer) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
