//! Axum router wiring.
//!
//! Cart routes accept GET and POST; ops routes are GET only.

use axum::{routing::get, Router};

use crate::{api, app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/add-to-cart", get(api::add_to_cart).post(api::add_to_cart))
        .route("/remove-from-cart", get(api::remove_from_cart).post(api::remove_from_cart))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
