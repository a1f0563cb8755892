//! Collected metric data handed from the provider to an exporter.
//!
//! These types are plain values: a collection pass builds them, the exporter
//! consumes them, and nothing holds on to them afterwards.

use std::fmt;

use serde::Serialize;

/// Typed attribute value. Status codes and other numbers stay integers all
/// the way to the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Str(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s),
            AttributeValue::Int(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Str(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

/// Attribute set as sorted `(key, value)` pairs.
pub type Attributes = Vec<(String, AttributeValue)>;

/// Static identity attributes attached to every batch from this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub attributes: Attributes,
}

impl Resource {
    pub const SERVICE_NAME: &'static str = "service.name";
    pub const SERVICE_VERSION: &'static str = "service.version";

    /// Resource carrying `service.name` and `service.version`.
    pub fn for_service(name: impl Into<String>, version: impl Into<String>) -> Self {
        let mut attributes = vec![
            (Self::SERVICE_NAME.to_string(), AttributeValue::Str(name.into())),
            (Self::SERVICE_VERSION.to_string(), AttributeValue::Str(version.into())),
        ];
        attributes.sort();
        Self { attributes }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_str())
    }

    pub fn service_name(&self) -> Option<&str> {
        self.get(Self::SERVICE_NAME)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Counter,
    Histogram,
    ObservableGauge,
}

/// Name, kind and documentation of an instrument, checked once at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentDescriptor {
    pub name: &'static str,
    pub kind: InstrumentKind,
    pub description: &'static str,
    pub unit: &'static str,
}

impl InstrumentDescriptor {
    pub const fn new(
        name: &'static str,
        kind: InstrumentKind,
        description: &'static str,
        unit: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            description,
            unit,
        }
    }
}

/// One counter series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SumPoint {
    pub attributes: Attributes,
    pub value: u64,
}

/// Histogram state at collection time.
///
/// `count` and `sum` are cumulative since process start; `samples` holds only
/// the values recorded since the previous collection pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramData {
    pub count: u64,
    pub sum: f64,
    pub samples: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricData {
    Sum { points: Vec<SumPoint> },
    Gauge { value: i64 },
    Histogram(HistogramData),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub data: MetricData,
}

impl Metric {
    pub fn from_descriptor(desc: &InstrumentDescriptor, data: MetricData) -> Self {
        Self {
            name: desc.name.to_string(),
            description: desc.description.to_string(),
            unit: desc.unit.to_string(),
            data,
        }
    }
}

/// Output of one collection pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceMetrics {
    pub resource: Resource,
    pub scope: String,
    pub time_unix_nano: u64,
    pub metrics: Vec<Metric>,
}

impl ResourceMetrics {
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
