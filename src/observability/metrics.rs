use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub messages_total: IntCounterVec,
    pub message_latency_seconds: HistogramVec,
    pub events_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let messages_total = IntCounterVec::new(
            Opts::new("messages_total", "Request messages handled by pattern and outcome"),
            &["pattern", "outcome"],
        )
        .expect("valid messages_total metric");

        let message_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "message_latency_seconds",
                "Latency of request message handling in seconds",
            ),
            &["pattern"],
        )
        .expect("valid message_latency_seconds metric");

        let events_total = IntCounterVec::new(
            Opts::new("events_total", "Events consumed by pattern and outcome"),
            &["pattern", "outcome"],
        )
        .expect("valid events_total metric");

        registry
            .register(Box::new(messages_total.clone()))
            .expect("register messages_total");
        registry
            .register(Box::new(message_latency_seconds.clone()))
            .expect("register message_latency_seconds");
        registry
            .register(Box::new(events_total.clone()))
            .expect("register events_total");

        Self {
            registry,
            messages_total,
            message_latency_seconds,
            events_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
