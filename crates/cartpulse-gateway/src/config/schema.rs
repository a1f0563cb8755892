use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use cartpulse_core::error::{CartPulseError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.telemetry.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(CartPulseError::Config(format!(
                "server.listen must be a valid socket address (got {:?})",
                self.listen
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// PEM file holding the only CA trusted for the collector connection.
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,

    /// Sent verbatim as the `signoz-access-token` header; empty is allowed.
    #[serde(default)]
    pub access_token: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_export_interval_ms")]
    pub export_interval_ms: u64,

    #[serde(default = "default_export_timeout_ms")]
    pub export_timeout_ms: u64,

    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            ca_cert_path: None,
            access_token: String::new(),
            service_name: default_service_name(),
            export_interval_ms: default_export_interval_ms(),
            export_timeout_ms: default_export_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(CartPulseError::Config("telemetry.endpoint must not be empty".into()));
        }
        match &self.ca_cert_path {
            Some(p) if !p.as_os_str().is_empty() => {}
            _ => {
                return Err(CartPulseError::Config(
                    "telemetry.ca_cert_path is required (set CA_CERT_PATH)".into(),
                ))
            }
        }
        if self.service_name.trim().is_empty() {
            return Err(CartPulseError::Config("telemetry.service_name must not be empty".into()));
        }
        if !(1000..=300_000).contains(&self.export_interval_ms) {
            return Err(CartPulseError::Config(
                "telemetry.export_interval_ms must be between 1000 and 300000".into(),
            ));
        }
        if self.export_timeout_ms == 0 {
            return Err(CartPulseError::Config("telemetry.export_timeout_ms must be > 0".into()));
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(CartPulseError::Config("telemetry.shutdown_timeout_ms must be > 0".into()));
        }
        // the final flush runs one export inside the shutdown deadline
        if self.export_timeout_ms > self.shutdown_timeout_ms {
            return Err(CartPulseError::Config(
                "telemetry.export_timeout_ms must not exceed telemetry.shutdown_timeout_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn export_interval(&self) -> Duration {
        Duration::from_millis(self.export_interval_ms)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Failure and delay injection for the cart routes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    #[serde(default = "default_add_error_rate")]
    pub add_error_rate: f64,

    #[serde(default = "default_remove_error_rate")]
    pub remove_error_rate: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            add_error_rate: default_add_error_rate(),
            remove_error_rate: default_remove_error_rate(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("add_error_rate", self.add_error_rate),
            ("remove_error_rate", self.remove_error_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(CartPulseError::Config(format!(
                    "simulation.{name} must be between 0 and 1"
                )));
            }
        }
        if self.max_delay_ms > 60_000 {
            return Err(CartPulseError::Config(
                "simulation.max_delay_ms must be at most 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_endpoint() -> String {
    "localhost:4317".into()
}
fn default_service_name() -> String {
    "cartpulse".into()
}
fn default_export_interval_ms() -> u64 {
    5000
}
fn default_export_timeout_ms() -> u64 {
    5000
}
fn default_shutdown_timeout_ms() -> u64 {
    5000
}
fn default_add_error_rate() -> f64 {
    0.3
}
fn default_remove_error_rate() -> f64 {
    0.1
}
fn default_max_delay_ms() -> u64 {
    100
}
