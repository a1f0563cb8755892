//! OTLP encoding of collected batches.
//!
//! Counters go out as cumulative monotonic sums, the cart gauge as an integer
//! gauge. Latency leaves as a delta histogram: each collection carries only
//! the samples recorded since the previous one, bucketed here against
//! [`LATENCY_BOUNDS`]. A batch that never reaches the collector takes its
//! samples with it.

use std::sync::{Mutex, PoisonError};

use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::metrics::v1::{
    metric, number_data_point, AggregationTemporality, Gauge, Histogram, HistogramDataPoint, Metric,
    NumberDataPoint, ResourceMetrics, ScopeMetrics, Sum,
};
use opentelemetry_proto::tonic::resource::v1::Resource;

use cartpulse_core::data::{self, AttributeValue, HistogramData, MetricData, SumPoint};

/// Latency bucket upper bounds in seconds; one overflow bucket follows.
pub const LATENCY_BOUNDS: [f64; 10] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Per-bucket counts: sample `v` lands in the first bucket whose bound is
/// `>= v`, or in the trailing overflow bucket.
pub fn bucketize(samples: &[f64], bounds: &[f64]) -> Vec<u64> {
    let mut counts = vec![0u64; bounds.len() + 1];
    for &v in samples {
        let idx = bounds.partition_point(|b| *b < v);
        counts[idx] += 1;
    }
    counts
}

/// Builds export requests and remembers where the last delta window ended.
pub struct OtlpEncoder {
    start_time_unix_nano: u64,
    last_collection: Mutex<u64>,
}

impl OtlpEncoder {
    /// `start_time_unix_nano` opens both the cumulative sums and the first
    /// histogram window.
    pub fn new(start_time_unix_nano: u64) -> Self {
        Self {
            start_time_unix_nano,
            last_collection: Mutex::new(start_time_unix_nano),
        }
    }

    pub fn encode(&self, batch: &data::ResourceMetrics) -> ExportMetricsServiceRequest {
        let now = batch.time_unix_nano;
        let window_start = {
            let mut last = self.last_collection.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *last, now)
        };

        let metrics = batch
            .metrics
            .iter()
            .map(|m| Metric {
                name: m.name.clone(),
                description: m.description.clone(),
                unit: m.unit.clone(),
                data: Some(match &m.data {
                    MetricData::Sum { points } => {
                        metric::Data::Sum(self.cumulative_sum(points, now))
                    }
                    MetricData::Gauge { value } => metric::Data::Gauge(Gauge {
                        data_points: vec![NumberDataPoint {
                            time_unix_nano: now,
                            value: Some(number_data_point::Value::AsInt(*value)),
                            ..Default::default()
                        }],
                    }),
                    MetricData::Histogram(h) => {
                        metric::Data::Histogram(delta_histogram(h, window_start, now))
                    }
                }),
                ..Default::default()
            })
            .collect();

        ExportMetricsServiceRequest {
            resource_metrics: vec![ResourceMetrics {
                resource: Some(Resource {
                    attributes: key_values(&batch.resource.attributes),
                    ..Default::default()
                }),
                scope_metrics: vec![ScopeMetrics {
                    scope: Some(InstrumentationScope {
                        name: batch.scope.clone(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                        ..Default::default()
                    }),
                    metrics,
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    fn cumulative_sum(&self, points: &[SumPoint], now: u64) -> Sum {
        Sum {
            data_points: points
                .iter()
                .map(|p| NumberDataPoint {
                    attributes: key_values(&p.attributes),
                    start_time_unix_nano: self.start_time_unix_nano,
                    time_unix_nano: now,
                    value: Some(number_data_point::Value::AsInt(
                        i64::try_from(p.value).unwrap_or(i64::MAX),
                    )),
                    ..Default::default()
                })
                .collect(),
            aggregation_temporality: AggregationTemporality::Cumulative as i32,
            is_monotonic: true,
        }
    }
}

fn delta_histogram(h: &HistogramData, start: u64, now: u64) -> Histogram {
    let samples = &h.samples;
    let point = HistogramDataPoint {
        start_time_unix_nano: start,
        time_unix_nano: now,
        count: samples.len() as u64,
        sum: Some(samples.iter().fold(0.0, |acc, v| acc + v)),
        min: samples.iter().copied().reduce(f64::min),
        max: samples.iter().copied().reduce(f64::max),
        bucket_counts: bucketize(samples, &LATENCY_BOUNDS),
        explicit_bounds: LATENCY_BOUNDS.to_vec(),
        ..Default::default()
    };
    Histogram {
        data_points: vec![point],
        aggregation_temporality: AggregationTemporality::Delta as i32,
    }
}

fn key_values(attrs: &data::Attributes) -> Vec<KeyValue> {
    attrs
        .iter()
        .map(|(k, v)| KeyValue {
            key: k.clone(),
            value: Some(AnyValue {
                value: Some(match v {
                    AttributeValue::Int(i) => any_value::Value::IntValue(*i),
                    AttributeValue::Str(s) => any_value::Value::StringValue(s.clone()),
                }),
            }),
        })
        .collect()
}
