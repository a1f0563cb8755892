//! Registry invariants: clamped gauge, exact counts, no lost updates.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::thread;

use cartpulse_core::data::{AttributeValue, MetricData, Resource};
use cartpulse_core::registry::{CART_ITEMS, ERROR_REQUESTS, HTTP_STATUS_CODE, REQUEST_LATENCY};
use cartpulse_core::{MeterProvider, MetricsRegistry};

fn setup() -> (MeterProvider, Arc<MetricsRegistry>) {
    let provider = MeterProvider::new(Resource::for_service("cart-test", "0.1.0"), "cartpulse");
    let registry = MetricsRegistry::new(&provider).unwrap();
    (provider, registry)
}

#[test]
fn gauge_sequence_clamps_at_zero() {
    let (_p, reg) = setup();
    let mut seen = Vec::new();
    for d in [1, 1, -1, -5, 2] {
        reg.increment_cart_items(d);
        seen.push(reg.observe_cart_items());
    }
    assert_eq!(seen, vec![1, 2, 1, 0, 2]);
}

#[test]
fn gauge_matches_clamped_prefix_sums() {
    let (_p, reg) = setup();
    let deltas = [3, -7, 4, 4, -2, -10, 0, 6, -1, 100, -99];
    let mut expected = 0i64;
    for d in deltas {
        reg.increment_cart_items(d);
        expected = (expected + d).max(0);
        assert_eq!(reg.observe_cart_items(), expected);
        assert!(reg.observe_cart_items() >= 0);
    }
}

#[test]
fn concurrent_increments_lose_nothing() {
    let (_p, reg) = setup();
    let threads = 16;
    let per_thread = 1_000;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let reg = Arc::clone(&reg);
            thread::spawn(move || {
                for _ in 0..per_thread {
                    reg.increment_cart_items(1);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(reg.observe_cart_items(), threads * per_thread);
}

#[test]
fn concurrent_mixed_deltas_end_at_clamped_sum() {
    // Positive deltas first so no intermediate state can clamp, then the
    // negative wave; the final value must equal max(0, sum).
    let (_p, reg) = setup();
    let up: Vec<_> = (0..8)
        .map(|_| {
            let reg = Arc::clone(&reg);
            thread::spawn(move || {
                for _ in 0..500 {
                    reg.increment_cart_items(2);
                }
            })
        })
        .collect();
    for h in up {
        h.join().unwrap();
    }

    let down: Vec<_> = (0..8)
        .map(|_| {
            let reg = Arc::clone(&reg);
            thread::spawn(move || {
                for _ in 0..250 {
                    reg.increment_cart_items(-3);
                }
            })
        })
        .collect();
    for h in down {
        h.join().unwrap();
    }

    assert_eq!(reg.observe_cart_items(), 8 * 500 * 2 - 8 * 250 * 3);
}

#[test]
fn errors_are_counted_per_status() {
    let (_p, reg) = setup();
    for code in [500, 500, 429] {
        reg.register_error(code);
    }
    assert_eq!(reg.error_total(), 3);
    assert_eq!(reg.errors_for_status(500), 2);
    assert_eq!(reg.errors_for_status(429), 1);
    assert_eq!(reg.errors_for_status(404), 0);

    let points = reg.error_points();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].attributes, vec![(HTTP_STATUS_CODE.to_string(), AttributeValue::Int(429))]);
    assert_eq!(points[0].attributes[0].1.as_i64(), Some(429));
}

#[test]
fn concurrent_errors_are_never_dropped() {
    let (_p, reg) = setup();
    let handles: Vec<_> = (0..8u16)
        .map(|i| {
            let reg = Arc::clone(&reg);
            thread::spawn(move || {
                for _ in 0..250 {
                    reg.register_error(if i % 2 == 0 { 500 } else { 503 });
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(reg.error_total(), 2_000);
    assert_eq!(reg.errors_for_status(500), 1_000);
    assert_eq!(reg.errors_for_status(503), 1_000);
}

#[test]
fn latency_keeps_every_sample() {
    let (provider, reg) = setup();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let reg = Arc::clone(&reg);
            thread::spawn(move || {
                for i in 0..250 {
                    reg.record_latency(f64::from(t * 1000 + i) / 1_000_000.0);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(reg.latency_count(), 1_000);

    let batch = provider.collect();
    let MetricData::Histogram(h) = &batch.metric(REQUEST_LATENCY.name).unwrap().data else {
        panic!("latency must collect as a histogram");
    };
    assert_eq!(h.count, 1_000);
    assert_eq!(h.samples.len(), 1_000);
}

#[test]
fn negative_latency_is_ignored() {
    let (_p, reg) = setup();
    reg.record_latency(-0.25);
    reg.record_latency(0.25);
    assert_eq!(reg.latency_count(), 1);
    assert!((reg.latency_sum() - 0.25).abs() < f64::EPSILON);
}

#[test]
fn collection_reports_all_three_instruments() {
    let (provider, reg) = setup();
    reg.increment_cart_items(4);
    reg.register_error(500);
    reg.record_latency(0.042);

    let batch = provider.collect();
    assert_eq!(batch.resource.service_name(), Some("cart-test"));
    assert_eq!(batch.scope, "cartpulse");
    assert_eq!(batch.metrics.len(), 3);

    match &batch.metric(CART_ITEMS.name).unwrap().data {
        MetricData::Gauge { value } => assert_eq!(*value, 4),
        other => panic!("unexpected gauge data: {other:?}"),
    }
    match &batch.metric(ERROR_REQUESTS.name).unwrap().data {
        MetricData::Sum { points } => assert_eq!(points[0].value, 1),
        other => panic!("unexpected counter data: {other:?}"),
    }

    // Observation does not mutate the gauge; histogram samples are drained.
    let again = provider.collect();
    match &again.metric(CART_ITEMS.name).unwrap().data {
        MetricData::Gauge { value } => assert_eq!(*value, 4),
        other => panic!("unexpected gauge data: {other:?}"),
    }
    match &again.metric(REQUEST_LATENCY.name).unwrap().data {
        MetricData::Histogram(h) => {
            assert_eq!(h.count, 1);
            assert!(h.samples.is_empty());
        }
        other => panic!("unexpected histogram data: {other:?}"),
    }
}

#[test]
fn batch_serializes_to_json() {
    let (provider, reg) = setup();
    reg.register_error(500);
    let json = serde_json::to_string(&provider.collect()).unwrap();
    assert!(json.contains("cartpulse_error_requests"));
    assert!(json.contains("\"type\":\"sum\""));
    assert!(json.contains("service.name"));
    assert!(json.contains("[\"http.status_code\",500]"));
}
