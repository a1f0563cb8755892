//! Telemetry pipeline lifecycle.
//!
//! `Uninitialized -> Initializing -> Running -> ShuttingDown -> Stopped`.
//! A failed `init` never yields a pipeline, so nothing is ever collected in
//! that case. `shutdown` runs once; later calls get `AlreadyShutdown`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{error, info, warn};

use cartpulse_core::data::Resource;
use cartpulse_core::error::{CartPulseError, Result};
use cartpulse_core::MeterProvider;

use crate::config::TelemetryConfig;
use crate::telemetry::exporter::{MetricExporter, OtlpMetricExporter};
use crate::telemetry::reader::{collect_and_export, PeriodicReader};
use crate::telemetry::tls;

/// Instrumentation scope reported with every batch.
pub const METER_SCOPE: &str = "cartpulse";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterState {
    Uninitialized,
    Initializing,
    Running,
    ShuttingDown,
    Stopped,
}

impl ExporterState {
    pub fn as_str(self) -> &'static str {
        match self {
            ExporterState::Uninitialized => "uninitialized",
            ExporterState::Initializing => "initializing",
            ExporterState::Running => "running",
            ExporterState::ShuttingDown => "shutting_down",
            ExporterState::Stopped => "stopped",
        }
    }
}

pub struct TelemetryPipeline {
    provider: Arc<MeterProvider>,
    exporter: Arc<dyn MetricExporter>,
    export_timeout: Duration,
    state: Mutex<ExporterState>,
    reader: tokio::sync::Mutex<Option<PeriodicReader>>,
}

impl TelemetryPipeline {
    /// Build the CA-pinned OTLP exporter and start periodic export.
    ///
    /// Any trust or endpoint problem is a `Config` error and must abort startup.
    pub async fn init(cfg: &TelemetryConfig) -> Result<Self> {
        log_transition(ExporterState::Uninitialized, ExporterState::Initializing);

        let exporter = match build_otlp_exporter(cfg) {
            Ok(exp) => exp,
            Err(e) => {
                error!(error = %e, "telemetry initialization failed");
                log_transition(ExporterState::Initializing, ExporterState::Stopped);
                return Err(e);
            }
        };
        info!(endpoint = %exporter.uri(), "collector exporter configured with TLS");

        Ok(Self::start(cfg, Arc::new(exporter)))
    }

    /// Same lifecycle with a caller-supplied exporter.
    pub async fn init_with_exporter(cfg: &TelemetryConfig, exporter: Arc<dyn MetricExporter>) -> Result<Self> {
        log_transition(ExporterState::Uninitialized, ExporterState::Initializing);
        Ok(Self::start(cfg, exporter))
    }

    fn start(cfg: &TelemetryConfig, exporter: Arc<dyn MetricExporter>) -> Self {
        let resource = Resource::for_service(cfg.service_name.clone(), env!("CARGO_PKG_VERSION"));
        let provider = Arc::new(MeterProvider::new(resource, METER_SCOPE));

        let reader = PeriodicReader::start(
            Arc::clone(&provider),
            Arc::clone(&exporter),
            cfg.export_interval(),
            cfg.export_timeout(),
        );

        log_transition(ExporterState::Initializing, ExporterState::Running);
        info!(service = %cfg.service_name, interval_ms = cfg.export_interval_ms, "meter provider running");

        Self {
            provider,
            exporter,
            export_timeout: cfg.export_timeout(),
            state: Mutex::new(ExporterState::Running),
            reader: tokio::sync::Mutex::new(Some(reader)),
        }
    }

    pub fn provider(&self) -> Arc<MeterProvider> {
        Arc::clone(&self.provider)
    }

    pub fn state(&self) -> ExporterState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Collect and export once, outside the timer.
    pub async fn force_flush(&self) -> Result<()> {
        if self.state() != ExporterState::Running {
            return Err(CartPulseError::AlreadyShutdown);
        }
        collect_and_export(&self.provider, self.exporter.as_ref(), self.export_timeout).await
    }

    /// Stop the timer and run one final flush within `deadline`, then close the
    /// exporter. Delivery is best effort; the state ends `Stopped` either way.
    pub async fn shutdown(&self, deadline: Duration) -> Result<()> {
        {
            let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *st != ExporterState::Running {
                return Err(CartPulseError::AlreadyShutdown);
            }
            *st = ExporterState::ShuttingDown;
        }
        log_transition(ExporterState::Running, ExporterState::ShuttingDown);

        let reader = self.reader.lock().await.take();
        let drained = tokio::time::timeout(deadline, async {
            if let Some(reader) = reader {
                reader.stop().await;
            }
            collect_and_export(&self.provider, self.exporter.as_ref(), self.export_timeout).await
        })
        .await;
        // the connection is released even when the flush ran out of time
        let closed = self.exporter.shutdown().await;
        let drained = drained.map(|flushed| flushed.and(closed));

        self.provider.shutdown();
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = ExporterState::Stopped;
        log_transition(ExporterState::ShuttingDown, ExporterState::Stopped);

        match drained {
            Ok(Ok(())) => {
                info!("final metric flush complete");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "final metric flush failed");
                Err(e)
            }
            Err(_) => {
                warn!(?deadline, "final metric flush did not finish before the deadline");
                Err(CartPulseError::ShutdownTimeout(deadline))
            }
        }
    }

    /// `shutdown`, with any failure logged rather than returned. Returns
    /// whether the final flush completed.
    pub async fn finish(&self, deadline: Duration) -> bool {
        match self.shutdown(deadline).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, code = e.code().as_str(), "telemetry shutdown incomplete");
                false
            }
        }
    }
}

fn build_otlp_exporter(cfg: &TelemetryConfig) -> Result<OtlpMetricExporter> {
    let ca_path = cfg
        .ca_cert_path
        .as_deref()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| CartPulseError::Config("CA certificate path is required".into()))?;

    let ca = tls::load_ca(ca_path)?;
    OtlpMetricExporter::new(&cfg.endpoint, &cfg.access_token, ca.tls_config(), cfg.export_timeout())
}

fn log_transition(from: ExporterState, to: ExporterState) {
    tracing::debug!(from = from.as_str(), to = to.as_str(), "telemetry state");
}
