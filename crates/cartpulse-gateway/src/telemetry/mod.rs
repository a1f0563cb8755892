//! Telemetry export: OTLP over CA-pinned gRPC, periodic reader and lifecycle.
//!
//! The registry in `cartpulse-core` only aggregates. This module owns getting
//! those aggregates out of the process on a timer, and the final flush at
//! shutdown.

pub mod exporter;
pub mod otlp;
pub mod pipeline;
pub mod reader;
pub mod tls;

pub use exporter::{MetricExporter, OtlpMetricExporter};
pub use pipeline::{ExporterState, TelemetryPipeline};
