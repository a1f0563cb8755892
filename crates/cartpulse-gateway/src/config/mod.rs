//! Service config loader (strict parsing + environment overrides).

pub mod schema;

use std::fs;
use std::path::Path;

use cartpulse_core::error::{CartPulseError, Result};

pub use schema::{ServerSection, ServiceConfig, SimulationConfig, TelemetryConfig};

pub const ENV_CONFIG_PATH: &str = "CARTPULSE_CONFIG";
pub const ENV_LISTEN: &str = "CARTPULSE_LISTEN";
pub const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub const ENV_CA_CERT_PATH: &str = "CA_CERT_PATH";
pub const ENV_ACCESS_TOKEN: &str = "SIGNOZ_ACCESS_TOKEN";
pub const ENV_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

const DEFAULT_CONFIG_PATH: &str = "cartpulse.yaml";

/// Load the process config: optional YAML file, then environment, then validate.
///
/// The file comes from `CARTPULSE_CONFIG` when set (and must exist);
/// otherwise `cartpulse.yaml` is used if present.
pub fn load() -> Result<ServiceConfig> {
    let lookup = |key: &str| std::env::var(key).ok();

    let mut cfg = match lookup(ENV_CONFIG_PATH) {
        Some(path) => parse_file(Path::new(&path))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => parse_file(Path::new(DEFAULT_CONFIG_PATH))?,
        None => ServiceConfig::default(),
    };
    apply_env_with(&mut cfg, lookup);
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_file(path: &Path) -> Result<ServiceConfig> {
    let cfg = parse_file(path)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg = parse_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Overlay environment values onto `cfg`. Unset or empty variables leave the
/// field alone, except the access token where an explicitly empty value is kept.
pub fn apply_env_with<F>(cfg: &mut ServiceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty(ENV_LISTEN) {
        cfg.server.listen = v;
    }
    if let Some(v) = non_empty(ENV_ENDPOINT) {
        cfg.telemetry.endpoint = v;
    }
    if let Some(v) = non_empty(ENV_CA_CERT_PATH) {
        cfg.telemetry.ca_cert_path = Some(v.into());
    }
    if let Some(v) = lookup(ENV_ACCESS_TOKEN) {
        cfg.telemetry.access_token = v;
    }
    if let Some(v) = non_empty(ENV_SERVICE_NAME) {
        cfg.telemetry.service_name = v;
    }
}

fn parse_file(path: &Path) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path).map_err(|e| {
        CartPulseError::Config(format!("read config failed ({}): {e}", path.display()))
    })?;
    parse_str(&s)
}

fn parse_str(s: &str) -> Result<ServiceConfig> {
    serde_yaml::from_str(s).map_err(|e| CartPulseError::Config(format!("invalid yaml: {e}")))
}
