//! Instrument registration happens exactly once per name.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use cartpulse_core::data::Resource;
use cartpulse_core::{ErrorCode, MeterProvider, MetricsRegistry};

fn provider() -> MeterProvider {
    MeterProvider::new(Resource::for_service("cart-test", "0.1.0"), "cartpulse")
}

#[test]
fn registry_registers_three_instruments() {
    let p = provider();
    let _reg = MetricsRegistry::new(&p).unwrap();
    assert_eq!(
        p.registered_instruments(),
        vec![
            "cartpulse_cart_items",
            "cartpulse_error_requests",
            "cartpulse_request_latency",
        ]
    );
}

#[test]
fn second_registry_on_same_provider_fails() {
    let p = provider();
    let _first = MetricsRegistry::new(&p).unwrap();
    let err = MetricsRegistry::new(&p).err().expect("duplicate names must fail");
    assert_eq!(err.code(), ErrorCode::InstrumentCreation);
    assert!(err.code().is_fatal());
}

#[test]
fn registry_on_shut_down_provider_fails() {
    let p = provider();
    p.shutdown();
    let err = MetricsRegistry::new(&p).err().expect("closed provider must refuse");
    assert_eq!(err.code().as_str(), "INSTRUMENT_CREATION");
}

#[test]
fn empty_provider_collects_nothing() {
    let p = provider();
    let batch = p.collect();
    assert!(batch.is_empty());
    assert!(batch.time_unix_nano > 0);
}
