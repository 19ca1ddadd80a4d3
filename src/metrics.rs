//! Prometheus metrics for the ingestion service.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,

    pub fetch_attempts_total: IntCounter,
    pub fetch_failures_total: IntCounter,
    pub fetch_exhausted_total: IntCounter,

    pub live_cycles_total: IntCounter,
    pub live_pairs_updated_total: IntCounter,
    pub live_pairs_skipped_total: IntCounter,
    pub cache_writes_total: IntCounter,
    pub cached_series: IntGauge,

    pub backfill_pages_total: IntCounter,
    pub snapshot_writes_total: IntCounter,
    pub snapshot_failures_total: IntCounter,

    pub http_requests_total: IntCounter,
    pub http_requests_in_flight: IntGauge,
    pub http_request_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };
        let gauge = |name: &str, help: &str| -> Result<IntGauge, prometheus::Error> {
            let g = IntGauge::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(g.clone()))?;
            Ok(g)
        };

        let fetch_attempts_total =
            counter("fetch_attempts_total", "Kline page requests attempted")?;
        let fetch_failures_total =
            counter("fetch_failures_total", "Kline page requests that failed")?;
        let fetch_exhausted_total = counter(
            "fetch_exhausted_total",
            "Fetches abandoned after the retry budget ran out",
        )?;
        let live_cycles_total = counter("live_cycles_total", "Completed live update cycles")?;
        let live_pairs_updated_total =
            counter("live_pairs_updated_total", "Pairs refreshed by the live updater")?;
        let live_pairs_skipped_total = counter(
            "live_pairs_skipped_total",
            "Pairs skipped by the live updater after exhausting retries",
        )?;
        let cache_writes_total = counter("cache_writes_total", "Series written to the cache")?;
        let cached_series = gauge("cached_series", "Entries currently held in the cache")?;
        let backfill_pages_total =
            counter("backfill_pages_total", "Pages merged by the backfill reconciler")?;
        let snapshot_writes_total =
            counter("snapshot_writes_total", "Snapshot files written")?;
        let snapshot_failures_total =
            counter("snapshot_failures_total", "Snapshot writes that failed")?;
        let http_requests_total = counter("http_requests_total", "HTTP requests served")?;
        let http_requests_in_flight =
            gauge("http_requests_in_flight", "HTTP requests currently being served")?;

        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            fetch_attempts_total,
            fetch_failures_total,
            fetch_exhausted_total,
            live_cycles_total,
            live_pairs_updated_total,
            live_pairs_skipped_total,
            cache_writes_total,
            cached_series,
            backfill_pages_total,
            snapshot_writes_total,
            snapshot_failures_total,
            http_requests_total,
            http_requests_in_flight,
            http_request_duration_seconds,
        })
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
