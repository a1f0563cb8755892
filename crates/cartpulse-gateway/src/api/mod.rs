//! Cart routes and the failure/delay simulation behind them.
//!
//! This is deliberately thin: each handler records into the registry and
//! renders a plain-text body. Recording is fire-and-forget.

pub mod cart;
pub mod simulation;

pub use cart::{add_to_cart, remove_from_cart, CartAction};
pub use simulation::Simulation;
