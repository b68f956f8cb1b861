//! Prometheus collectors for watch loops, heartbeats and agent queries.
//!
//! Collectors are process-wide statics; [`register_custom_metrics`] attaches
//! them to any registry and [`start_server`] exposes the default one over
//! HTTP.

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    pub static ref QUERY_DURATION_METRIC: HistogramVec = HistogramVec::new(
        HistogramOpts::new("query_duration_seconds", "Latency of agent queries in seconds")
            .buckets(exponential_buckets(0.001, 2.0, 20).expect("valid buckets")),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_EVENTS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_events", "Events dispatched by watch loops"),
        &["watch", "event"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_POLL_FAILURES_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_poll_failures", "Failed blocking queries of watch loops"),
        &["watch"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_LAST_INDEX_METRIC: IntGaugeVec = IntGaugeVec::new(
        Opts::new("watch_last_index", "Last resource index observed by watch loops"),
        &["watch"]
    )
    .expect("metric can not be created");

    pub static ref HEARTBEAT_REPORTS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("heartbeat_reports", "TTL check reports by outcome"),
        &["result"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry =
        Registry::new_custom(Some("catalog_watch".to_string()), None).expect("registry can be created");
}

/// Attaches every collector to `registry`. Collectors already present are
/// skipped.
pub fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(QUERY_DURATION_METRIC.clone()),
        Box::new(WATCH_EVENTS_METRIC.clone()),
        Box::new(WATCH_POLL_FAILURES_METRIC.clone()),
        Box::new(WATCH_LAST_INDEX_METRIC.clone()),
        Box::new(HEARTBEAT_REPORTS_METRIC.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            debug!("collector not registered: {}", e);
        }
    }
}

/// Serves `GET /metrics` from [`REGISTRY`] until `shutdown` fires.
pub async fn start_server(
    port: u16,
    shutdown: CancellationToken,
) {
    register_custom_metrics(&REGISTRY);

    let metrics_route = warp::path!("metrics")
        .map(|| REGISTRY.clone())
        .and_then(metrics_handler);

    info!(port, "metrics server listening");
    let (_, server) = warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
        shutdown.cancelled().await;
    });
    server.await;
}

async fn metrics_handler(registry: Registry) -> std::result::Result<impl Reply, Rejection> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    let body = match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    };
    Ok(warp::reply::with_header(
        body,
        "Content-Type",
        "text/plain; charset=utf-8",
    ))
}
