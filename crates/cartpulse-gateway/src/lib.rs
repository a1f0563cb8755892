//! cartpulse gateway library entry.
//!
//! This crate wires configuration, the telemetry pipeline, the cart routes and
//! the ops endpoints into one service. It is intended to be consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod ops;
pub mod router;
pub mod telemetry;
