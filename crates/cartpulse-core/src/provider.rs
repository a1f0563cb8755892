//! Explicit meter provider.
//!
//! One `MeterProvider` is built at startup and handed to whoever needs it;
//! there is no global lookup. It owns the resource descriptor, guards
//! instrument registration (each name exactly once) and fans a collection
//! pass out to the registered producers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::{DashMap, DashSet};

use crate::data::{InstrumentDescriptor, Metric, Resource, ResourceMetrics};
use crate::error::{CartPulseError, Result};

const MAX_INSTRUMENT_NAME_LEN: usize = 255;

/// Pull-side capability: a producer reports its current values when the
/// provider collects. Called from the exporter's timer task, never from the
/// request path.
pub trait MetricProducer: Send + Sync {
    fn produce(&self) -> Vec<Metric>;
}

pub struct MeterProvider {
    resource: Resource,
    scope: String,
    instruments: DashSet<&'static str>,
    producers: DashMap<&'static str, Arc<dyn MetricProducer>>,
    shut_down: AtomicBool,
}

impl MeterProvider {
    pub fn new(resource: Resource, scope: impl Into<String>) -> Self {
        Self {
            resource,
            scope: scope.into(),
            instruments: DashSet::new(),
            producers: DashMap::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Reserve an instrument name. Fails on an invalid or duplicate name, or
    /// once the provider has been shut down.
    pub fn register_instrument(&self, desc: &InstrumentDescriptor) -> Result<()> {
        if self.is_shut_down() {
            return Err(CartPulseError::InstrumentCreation(format!(
                "provider is shut down (instrument={})",
                desc.name
            )));
        }
        validate_instrument_name(desc.name)?;
        if !self.instruments.insert(desc.name) {
            return Err(CartPulseError::InstrumentCreation(format!(
                "duplicate instrument name: {}",
                desc.name
            )));
        }
        tracing::debug!(instrument = desc.name, kind = ?desc.kind, "instrument registered");
        Ok(())
    }

    pub fn register_producer(&self, name: &'static str, producer: Arc<dyn MetricProducer>) -> Result<()> {
        if self.is_shut_down() {
            return Err(CartPulseError::InstrumentCreation(format!(
                "provider is shut down (producer={name})"
            )));
        }
        if self.producers.contains_key(name) {
            return Err(CartPulseError::InstrumentCreation(format!(
                "duplicate producer: {name}"
            )));
        }
        self.producers.insert(name, producer);
        Ok(())
    }

    pub fn registered_instruments(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.instruments.iter().map(|n| *n.key()).collect();
        names.sort_unstable();
        names
    }

    /// Run one collection pass over every producer.
    pub fn collect(&self) -> ResourceMetrics {
        let producers: Vec<Arc<dyn MetricProducer>> =
            self.producers.iter().map(|e| Arc::clone(e.value())).collect();

        let mut metrics: Vec<Metric> = producers.iter().flat_map(|p| p.produce()).collect();
        metrics.sort_by(|a, b| a.name.cmp(&b.name));

        ResourceMetrics {
            resource: self.resource.clone(),
            scope: self.scope.clone(),
            time_unix_nano: now_unix_nano(),
            metrics,
        }
    }

    /// Mark the provider closed. Later registrations fail. Returns `false`
    /// if it was already closed.
    pub fn shutdown(&self) -> bool {
        !self.shut_down.swap(true, Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

/// Instrument names: ASCII letter first, then `[A-Za-z0-9_.-/]`, at most 255 chars.
fn validate_instrument_name(name: &str) -> Result<()> {
    let invalid = |why: &str| {
        Err(CartPulseError::InstrumentCreation(format!(
            "invalid instrument name {name:?}: {why}"
        )))
    };

    let Some(first) = name.chars().next() else {
        return invalid("empty");
    };
    if name.len() > MAX_INSTRUMENT_NAME_LEN {
        return invalid("too long");
    }
    if !first.is_ascii_alphabetic() {
        return invalid("must start with a letter");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'))
    {
        return invalid("unsupported character");
    }
    Ok(())
}

fn now_unix_nano() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InstrumentKind;

    fn desc(name: &'static str) -> InstrumentDescriptor {
        InstrumentDescriptor::new(name, InstrumentKind::Counter, "test", "")
    }

    fn provider() -> MeterProvider {
        MeterProvider::new(Resource::for_service("test", "0.0.0"), "test")
    }

    #[test]
    fn rejects_bad_names() {
        let p = provider();
        for name in ["", "1abc", "has space", "ünicode"] {
            let err = p.register_instrument(&desc(name));
            assert!(err.is_err(), "{name:?} must be rejected");
        }
        assert!(p.register_instrument(&desc("a.b-c/d_e")).is_ok());
    }

    #[test]
    fn shutdown_reports_first_call_only() {
        let p = provider();
        assert!(p.shutdown());
        assert!(!p.shutdown());
        assert!(p.is_shut_down());
    }
}
