//! Prometheus metrics for the HTTP surface and the cycle engine

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,
    /// Completed cycles labelled by outcome (`ok`, `failed`, `busy`, `suspended`, `blocked`)
    pub cycles_total: IntCounterVec,
    pub cycle_duration_seconds: Histogram,
    pub emergency_stops_total: IntCounter,
    pub engine_stopped: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ))?;
        let http_requests_in_flight = IntGauge::new(
            "http_requests_in_flight",
            "Number of HTTP requests currently being served",
        )?;
        let cycles_total = IntCounterVec::new(
            Opts::new("agent_cycles_total", "Decision cycles by outcome"),
            &["outcome"],
        )?;
        let cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "agent_cycle_duration_seconds",
                "Wall time of a decision cycle in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        let emergency_stops_total = IntCounter::new(
            "emergency_stops_total",
            "Number of emergency stop invocations",
        )?;
        let engine_stopped = Gauge::new(
            "engine_stopped",
            "1 while the emergency stop is active, 0 otherwise",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;
        registry.register(Box::new(emergency_stops_total.clone()))?;
        registry.register(Box::new(engine_stopped.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            cycles_total,
            cycle_duration_seconds,
            emergency_stops_total,
            engine_stopped,
        })
    }

    /// Render all registered metrics in the Prometheus text format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
