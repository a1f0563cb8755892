//! Shared error type across cartpulse crates.

use std::time::Duration;

use thiserror::Error;

/// Stable error codes (used in logs and process exit diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad or missing configuration, including the CA trust chain.
    Config,
    /// The provider rejected an instrument registration.
    InstrumentCreation,
    /// A flush to the collector failed.
    Export,
    /// The final flush did not finish before the shutdown deadline.
    ShutdownTimeout,
    /// Shutdown was requested on a pipeline that is no longer running.
    AlreadyShutdown,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in structured logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Config => "CONFIG",
            ErrorCode::InstrumentCreation => "INSTRUMENT_CREATION",
            ErrorCode::Export => "EXPORT",
            ErrorCode::ShutdownTimeout => "SHUTDOWN_TIMEOUT",
            ErrorCode::AlreadyShutdown => "ALREADY_SHUTDOWN",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// Startup errors after which the process must not serve traffic.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorCode::Config | ErrorCode::InstrumentCreation)
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, CartPulseError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum CartPulseError {
    #[error("config: {0}")]
    Config(String),
    #[error("instrument creation: {0}")]
    InstrumentCreation(String),
    #[error("export: {0}")]
    Export(String),
    #[error("shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
    #[error("telemetry pipeline already shut down")]
    AlreadyShutdown,
    #[error("internal: {0}")]
    Internal(String),
}

impl CartPulseError {
    /// Map an error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            CartPulseError::Config(_) => ErrorCode::Config,
            CartPulseError::InstrumentCreation(_) => ErrorCode::InstrumentCreation,
            CartPulseError::Export(_) => ErrorCode::Export,
            CartPulseError::ShutdownTimeout(_) => ErrorCode::ShutdownTimeout,
            CartPulseError::AlreadyShutdown => ErrorCode::AlreadyShutdown,
            CartPulseError::Internal(_) => ErrorCode::Internal,
        }
    }
}
