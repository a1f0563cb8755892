#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;
use std::path::PathBuf;

use cartpulse_gateway::config::{self, ServiceConfig};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
telemetry:
  ca_cert_path: "/etc/cartpulse/ca.pem"
  endpiont: "collector:4317" # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
telemetry:
  ca_cert_path: "/etc/cartpulse/ca.pem"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    assert_eq!(cfg.telemetry.endpoint, "localhost:4317");
    assert_eq!(cfg.telemetry.access_token, "");
    assert_eq!(cfg.telemetry.service_name, "cartpulse");
    assert_eq!(cfg.telemetry.export_interval_ms, 5000);
    assert_eq!(cfg.simulation.add_error_rate, 0.3);
    assert_eq!(cfg.simulation.remove_error_rate, 0.1);
    assert_eq!(cfg.simulation.max_delay_ms, 100);
}

#[test]
fn ca_cert_path_is_required() {
    let err = config::load_from_str("server:\n  listen: \"127.0.0.1:9000\"\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
    assert!(err.to_string().contains("ca_cert_path"));
}

#[test]
fn error_rate_out_of_range_fails() {
    let bad = r#"
telemetry:
  ca_cert_path: "/etc/cartpulse/ca.pem"
simulation:
  add_error_rate: 1.5
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn export_interval_bounds() {
    let bad = r#"
telemetry:
  ca_cert_path: "/etc/cartpulse/ca.pem"
  export_interval_ms: 10
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn env_overrides_file_values() {
    let env: HashMap<&str, &str> = [
        ("OTEL_EXPORTER_OTLP_ENDPOINT", "collector.internal:4318"),
        ("CA_CERT_PATH", "/run/secrets/ca.pem"),
        ("SIGNOZ_ACCESS_TOKEN", "s3cret"),
        ("OTEL_SERVICE_NAME", "cart-demo"),
        ("CARTPULSE_LISTEN", "127.0.0.1:18080"),
    ]
    .into_iter()
    .collect();

    let mut cfg = ServiceConfig::default();
    config::apply_env_with(&mut cfg, |k| env.get(k).map(|v| v.to_string()));
    cfg.validate().unwrap();

    assert_eq!(cfg.telemetry.endpoint, "collector.internal:4318");
    assert_eq!(cfg.telemetry.ca_cert_path, Some(PathBuf::from("/run/secrets/ca.pem")));
    assert_eq!(cfg.telemetry.access_token, "s3cret");
    assert_eq!(cfg.telemetry.service_name, "cart-demo");
    assert_eq!(cfg.server.listen, "127.0.0.1:18080");
}

#[test]
fn empty_endpoint_env_keeps_default() {
    let mut cfg = ServiceConfig::default();
    config::apply_env_with(&mut cfg, |k| match k {
        "OTEL_EXPORTER_OTLP_ENDPOINT" => Some(String::new()),
        "SIGNOZ_ACCESS_TOKEN" => Some(String::new()),
        _ => None,
    });
    assert_eq!(cfg.telemetry.endpoint, "localhost:4317");
    assert_eq!(cfg.telemetry.access_token, "");
}

#[test]
fn missing_config_file_is_config_error() {
    let err = config::load_from_file(std::path::Path::new("/nonexistent/cartpulse.yaml")).unwrap_err();
    assert_eq!(err.code().as_str(), "CONFIG");
}

#[test]
fn export_timeout_must_fit_inside_shutdown_deadline() {
    let bad = r#"
telemetry:
  ca_cert_path: "/etc/cartpulse/ca.pem"
  export_timeout_ms: 10000
  shutdown_timeout_ms: 5000
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("export_timeout_ms"));

    let ok = r#"
telemetry:
  ca_cert_path: "/etc/cartpulse/ca.pem"
"#;
    let cfg = config::load_from_str(ok).expect("defaults must validate");
    assert!(cfg.telemetry.export_timeout() <= cfg.telemetry.shutdown_timeout());
}
