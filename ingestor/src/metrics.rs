use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref READINGS_INSERTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_readings_inserted_total",
        "Total readings written to the store"
    ))
    .unwrap();
    pub static ref READINGS_REJECTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_readings_rejected_total",
        "Total readings rejected by validation"
    ))
    .unwrap();
    pub static ref DB_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_db_failures_total",
        "Total failed store operations"
    ))
    .unwrap();
    pub static ref QUERY_LATENCY_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "ingestor_query_latency_seconds",
            "Time taken by store operations"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ]),
        &["operation"]
    )
    .unwrap();
    pub static ref RETENTION_RUNS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_retention_runs_total",
        "Total completed retention runs"
    ))
    .unwrap();
    pub static ref RETENTION_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_retention_failures_total",
        "Total retention runs aborted by an error"
    ))
    .unwrap();
    pub static ref RETENTION_SKIPPED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_retention_skipped_total",
        "Total retention triggers skipped because a run was in flight"
    ))
    .unwrap();
    pub static ref RETENTION_DELETED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_retention_deleted_total",
        "Total readings deleted by retention"
    ))
    .unwrap();
    pub static ref RETENTION_RUN_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ingestor_retention_run_seconds",
            "Wall time of a retention run"
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0])
    )
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(READINGS_INSERTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(READINGS_REJECTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DB_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUERY_LATENCY_SECONDS.clone()))?;
    REGISTRY.register(Box::new(RETENTION_RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RETENTION_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RETENTION_SKIPPED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RETENTION_DELETED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RETENTION_RUN_SECONDS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_exposes_registered_metrics() {
        // Registration is process-global; a second test run in the same
        // binary may already have registered.
        let _ = init_metrics();
        READINGS_INSERTED_TOTAL.inc();

        let text = gather_metrics();
        assert!(text.contains("ingestor_readings_inserted_total"));
    }
}
