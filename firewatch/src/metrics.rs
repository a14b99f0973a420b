use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref SAMPLES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_samples_total",
        "Total sensor samples received"
    ))
    .unwrap();
    pub static ref INVALID_SAMPLES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_invalid_samples_total",
        "Total samples rejected by validation"
    ))
    .unwrap();
    pub static ref STORE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_store_failures_total",
        "Total failed ingest writes to the backing store"
    ))
    .unwrap();
    pub static ref UNAUTHORIZED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_unauthorized_total",
        "Total admin requests rejected by the access gate"
    ))
    .unwrap();
    pub static ref INGEST_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "firewatch_ingest_latency_seconds",
            "Time taken to persist one sample"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(SAMPLES_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(INVALID_SAMPLES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(STORE_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(UNAUTHORIZED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(INGEST_LATENCY_SECONDS.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
