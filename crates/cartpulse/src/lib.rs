//! Top-level facade crate for cartpulse.
//!
//! Re-exports the metrics core and the gateway library so users can depend on a single crate.

pub mod core {
    pub use cartpulse_core::*;
}

pub mod gateway {
    pub use cartpulse_gateway::*;
}
