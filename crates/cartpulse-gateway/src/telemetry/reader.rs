//! Periodic reader: the single background task that collects from the
//! provider and pushes to the exporter on a fixed interval.
//!
//! Each tick is an independent attempt. A failed or abandoned
//! export is logged and its samples are gone; there is no retry queue.
//! Request handlers never wait on this task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use cartpulse_core::error::{CartPulseError, Result};
use cartpulse_core::MeterProvider;

use crate::telemetry::exporter::MetricExporter;

pub struct PeriodicReader {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PeriodicReader {
    /// Spawn the export loop on the current runtime.
    pub fn start(
        provider: Arc<MeterProvider>,
        exporter: Arc<dyn MetricExporter>,
        interval: Duration,
        export_timeout: Duration,
    ) -> Self {
        let (cancel, mut cancelled) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick fires immediately
            ticker.tick().await;

            info!(?interval, "periodic metric export started");
            loop {
                let ticked = tokio::select! {
                    _ = ticker.tick() => true,
                    // any change, or a dropped sender, means stop
                    _ = cancelled.changed() => false,
                };
                if !ticked {
                    break;
                }

                let outcome = tokio::select! {
                    res = collect_and_export(&provider, exporter.as_ref(), export_timeout) => Some(res),
                    _ = cancelled.changed() => None,
                };
                match outcome {
                    Some(Ok(())) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, code = e.code().as_str(), "periodic export failed");
                    }
                    None => {
                        warn!("periodic export abandoned for shutdown");
                        break;
                    }
                }
            }
            debug!("periodic metric export stopped");
        });

        Self { cancel, task }
    }

    /// Signal the loop to stop and wait for it. An export still in flight is
    /// dropped, so this returns without waiting on the collector.
    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "periodic reader task ended abnormally");
        }
    }
}

/// One collection pass followed by one export attempt, bounded by `timeout`.
pub async fn collect_and_export(
    provider: &MeterProvider,
    exporter: &dyn MetricExporter,
    timeout: Duration,
) -> Result<()> {
    let batch = provider.collect();
    if batch.is_empty() {
        debug!("nothing registered; skipping export");
        return Ok(());
    }
    match tokio::time::timeout(timeout, exporter.export(&batch)).await {
        Ok(res) => res,
        Err(_) => Err(CartPulseError::Export(format!("export timed out after {timeout:?}"))),
    }
}
