use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    Add,
    Remove,
}

impl CartAction {
    pub fn delta(self) -> i64 {
        match self {
            CartAction::Add => 1,
            CartAction::Remove => -1,
        }
    }

    fn ok_message(self) -> &'static str {
        match self {
            CartAction::Add => "Item added to cart.",
            CartAction::Remove => "Item removed from cart.",
        }
    }

    fn error_message(self) -> &'static str {
        match self {
            CartAction::Add => "Error adding item to cart",
            CartAction::Remove => "Error removing item from cart",
        }
    }
}

pub async fn add_to_cart(State(state): State<AppState>) -> Response {
    handle_cart_change(&state, CartAction::Add).await
}

pub async fn remove_from_cart(State(state): State<AppState>) -> Response {
    handle_cart_change(&state, CartAction::Remove).await
}

async fn handle_cart_change(state: &AppState, action: CartAction) -> Response {
    let started = Instant::now();
    let registry = state.registry();
    let sim = state.simulation();

    let status = if sim.should_fail(action) {
        registry.register_error(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        registry.increment_cart_items(action.delta());
        StatusCode::OK
    };

    let delay = sim.delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let elapsed = started.elapsed();
    registry.record_latency(elapsed.as_secs_f64());
    tracing::debug!(?action, status = status.as_u16(), elapsed_ms = elapsed.as_millis() as u64, "cart request");

    if status.is_success() {
        let body = format!("{} Total items: {}", action.ok_message(), registry.observe_cart_items());
        (status, body).into_response()
    } else {
        (status, action.error_message()).into_response()
    }
}
