use lazy_static::lazy_static;
#[cfg(target_os = "linux")]
use prometheus::process_collector::ProcessCollector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Instant;

use crate::{errors::ActionResult, models::action::ActionKind};

lazy_static! {
    pub static ref ACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("social_relay_actions_total", "Total number of actions by kind and outcome"),
        &["kind", "outcome"]
    )
    .unwrap();
    pub static ref ACTION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "social_relay_action_duration_seconds",
            "Time from session lookup to indexing confirmation"
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["kind"]
    )
    .unwrap();
    pub static ref INDEX_STATUS_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "social_relay_index_status_queries_total",
            "Total number of indexing status queries by observed status"
        ),
        &["status"]
    )
    .unwrap();
}

#[derive(Debug, Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        // OS/machine metrics (Linux only)
        #[cfg(target_os = "linux")]
        registry.register(Box::new(ProcessCollector::for_self()))?;

        registry.register(Box::new(ACTIONS_TOTAL.clone()))?;
        registry.register(Box::new(ACTION_DURATION.clone()))?;
        registry.register(Box::new(INDEX_STATUS_QUERIES_TOTAL.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    /// Prometheus text exposition of everything registered.
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Track one action run: duration by kind, count by kind and outcome.
pub async fn track_action<T, F>(kind: ActionKind, f: F) -> ActionResult<T>
where
    F: std::future::Future<Output = ActionResult<T>>,
{
    let start = Instant::now();

    let result = f.await;

    ACTION_DURATION
        .with_label_values(&[kind.as_str()])
        .observe(start.elapsed().as_secs_f64());

    let outcome = match &result {
        Ok(_) => "indexed",
        Err(e) => e.label(),
    };
    ACTIONS_TOTAL.with_label_values(&[kind.as_str(), outcome]).inc();

    result
}
