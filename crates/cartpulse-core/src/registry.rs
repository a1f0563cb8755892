//! Cart metrics registry.
//!
//! Owns the three instruments the request layer touches: an error counter
//! tagged by HTTP status, a request latency histogram (seconds) and the cart
//! size gauge. Recording never fails and never blocks on I/O; the exporter
//! reads everything back through [`MetricProducer::produce`].

use std::sync::Arc;

use crate::data::{AttributeValue, InstrumentDescriptor, InstrumentKind, Metric, MetricData, SumPoint};
use crate::error::Result;
use crate::instruments::{ClampedGauge, CounterVec, Histogram};
use crate::provider::{MeterProvider, MetricProducer};

pub const ERROR_REQUESTS: InstrumentDescriptor = InstrumentDescriptor::new(
    "cartpulse_error_requests",
    InstrumentKind::Counter,
    "Counter for error requests",
    "",
);

pub const REQUEST_LATENCY: InstrumentDescriptor = InstrumentDescriptor::new(
    "cartpulse_request_latency",
    InstrumentKind::Histogram,
    "Histogram for request latency",
    "s",
);

pub const CART_ITEMS: InstrumentDescriptor = InstrumentDescriptor::new(
    "cartpulse_cart_items",
    InstrumentKind::ObservableGauge,
    "Number of items in the cart",
    "",
);

/// Attribute key carried by every error counter increment.
pub const HTTP_STATUS_CODE: &str = "http.status_code";

const PRODUCER_NAME: &str = "cartpulse.registry";

fn status_attribute(status_code: u16) -> (&'static str, AttributeValue) {
    (HTTP_STATUS_CODE, AttributeValue::Int(i64::from(status_code)))
}

pub struct MetricsRegistry {
    errors: CounterVec,
    latency: Histogram,
    cart_items: ClampedGauge,
}

impl MetricsRegistry {
    /// Register all instruments on `provider` and attach the registry as its
    /// producer. Any failure here is a startup error.
    pub fn new(provider: &MeterProvider) -> Result<Arc<Self>> {
        for desc in [&ERROR_REQUESTS, &REQUEST_LATENCY, &CART_ITEMS] {
            provider.register_instrument(desc)?;
        }

        let registry = Arc::new(Self {
            errors: CounterVec::default(),
            latency: Histogram::default(),
            cart_items: ClampedGauge::default(),
        });
        provider.register_producer(PRODUCER_NAME, Arc::clone(&registry) as Arc<dyn MetricProducer>)?;

        tracing::info!(
            instruments = ?provider.registered_instruments(),
            "metrics registry initialized"
        );
        Ok(registry)
    }

    /// Add `delta` to the cart size, clamping at zero.
    pub fn increment_cart_items(&self, delta: i64) {
        let count = self.cart_items.add(delta);
        tracing::trace!(delta, count, "cart items updated");
    }

    /// Record one request duration in seconds. Negative durations are ignored.
    pub fn record_latency(&self, seconds: f64) {
        self.latency.record(seconds);
    }

    /// Count one failed request, tagged with its status code.
    pub fn register_error(&self, status_code: u16) {
        self.errors.inc(&[status_attribute(status_code)]);
    }

    /// Current cart size. Read-only; used by the collection pass and by
    /// response rendering.
    pub fn observe_cart_items(&self) -> i64 {
        self.cart_items.get()
    }

    pub fn error_total(&self) -> u64 {
        self.errors.total()
    }

    pub fn errors_for_status(&self, status_code: u16) -> u64 {
        self.errors.get(&[status_attribute(status_code)])
    }

    pub fn error_points(&self) -> Vec<SumPoint> {
        self.errors.points()
    }

    pub fn latency_count(&self) -> u64 {
        self.latency.count()
    }

    pub fn latency_sum(&self) -> f64 {
        self.latency.sum()
    }
}

impl MetricProducer for MetricsRegistry {
    fn produce(&self) -> Vec<Metric> {
        vec![
            Metric::from_descriptor(
                &ERROR_REQUESTS,
                MetricData::Sum {
                    points: self.errors.points(),
                },
            ),
            Metric::from_descriptor(&REQUEST_LATENCY, MetricData::Histogram(self.latency.drain())),
            Metric::from_descriptor(
                &CART_ITEMS,
                MetricData::Gauge {
                    value: self.observe_cart_items(),
                },
            ),
        ]
    }
}
