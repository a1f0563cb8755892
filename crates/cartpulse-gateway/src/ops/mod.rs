//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 when draining)
//! - `/metrics` : Prometheus text view of the registry (read-only; never
//!   drains the samples waiting for the next export)

use std::fmt::Write;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use cartpulse_core::registry::{CART_ITEMS, ERROR_REQUESTS, REQUEST_LATENCY};
use cartpulse_core::MetricsRegistry;

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = render(&state.registry(), state.is_draining());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Render the registry in Prometheus text exposition format.
pub fn render(registry: &MetricsRegistry, draining: bool) -> String {
    let mut out = String::new();

    let name = ERROR_REQUESTS.name;
    let _ = writeln!(out, "# HELP {name} {}", ERROR_REQUESTS.description);
    let _ = writeln!(out, "# TYPE {name} counter");
    for p in registry.error_points() {
        let labels = p
            .attributes
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k.replace('.', "_"), escape_label(&v.to_string())))
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(out, "{name}{{{labels}}} {}", p.value);
    }

    // bucketing belongs to the exporter; only totals are shown here
    let name = REQUEST_LATENCY.name;
    let _ = writeln!(out, "# HELP {name} {}", REQUEST_LATENCY.description);
    let _ = writeln!(out, "# TYPE {name} summary");
    let _ = writeln!(out, "{name}_sum {}", registry.latency_sum());
    let _ = writeln!(out, "{name}_count {}", registry.latency_count());

    let name = CART_ITEMS.name;
    let _ = writeln!(out, "# HELP {name} {}", CART_ITEMS.description);
    let _ = writeln!(out, "# TYPE {name} gauge");
    let _ = writeln!(out, "{name} {}", registry.observe_cart_items());

    let _ = writeln!(
        out,
        "# TYPE cartpulse_draining gauge\ncartpulse_draining {}",
        if draining { 1 } else { 0 }
    );
    out
}
