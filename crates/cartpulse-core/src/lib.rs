//! cartpulse core: in-process metrics aggregation for the cart service.
//!
//! This crate holds the error surface, the instrument primitives, the explicit
//! `MeterProvider` and the `MetricsRegistry` the request layer records into.
//! It carries no transport or runtime dependencies; exporting lives in the
//! gateway crate.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Recording paths are infallible and never poison the caller.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod data;
pub mod error;
pub mod instruments;
pub mod provider;
pub mod registry;

/// Shared result type.
pub use error::{CartPulseError, ErrorCode, Result};
pub use provider::{MeterProvider, MetricProducer};
pub use registry::MetricsRegistry;
