//! cartpulse gateway
//!
//! Cart simulation endpoints that feed the metrics registry, with periodic
//! TLS export to the collector and a final flush on shutdown.

use std::net::SocketAddr;
use std::process::ExitCode;

use axum::Router;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use cartpulse_core::error::{CartPulseError, Result};
use cartpulse_core::MetricsRegistry;
use cartpulse_gateway::api::Simulation;
use cartpulse_gateway::app_state::AppState;
use cartpulse_gateway::telemetry::TelemetryPipeline;
use cartpulse_gateway::{config, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, code = e.code().as_str(), "cartpulse-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load()?;
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| CartPulseError::Config(format!("server.listen: {e}")))?;

    // Startup failures past this point must still stop the export task.
    let telemetry = TelemetryPipeline::init(&cfg.telemetry).await?;
    let deadline = cfg.telemetry.shutdown_timeout();

    let registry = match MetricsRegistry::new(&telemetry.provider()) {
        Ok(r) => r,
        Err(e) => {
            telemetry.finish(deadline).await;
            return Err(e);
        }
    };

    let state = AppState::new(registry, Simulation::new(cfg.simulation.clone()));
    let app = router::build_router(state.clone());
    let served = serve(listen, app, state).await;

    // reported only; exit is not held up
    telemetry.finish(deadline).await;
    served
}

async fn serve(listen: SocketAddr, app: Router, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| CartPulseError::Internal(format!("failed to bind {listen}: {e}")))?;

    info!(%listen, "cartpulse-gateway starting");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| CartPulseError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
    state.set_draining();
}
