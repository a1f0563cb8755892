//! Shared application state for the cart service.
//!
//! Handlers get the registry and the simulation settings from here; the
//! registry itself is created once at startup from the telemetry provider.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cartpulse_core::MetricsRegistry;

use crate::api::Simulation;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    registry: Arc<MetricsRegistry>,
    simulation: Simulation,
    draining: AtomicBool,
}

impl AppState {
    pub fn new(registry: Arc<MetricsRegistry>, simulation: Simulation) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                registry,
                simulation,
                draining: AtomicBool::new(false),
            }),
        }
    }

    pub fn registry(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn simulation(&self) -> &Simulation {
        &self.inner.simulation
    }

    /// Mark draining state (readiness turns 503).
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
