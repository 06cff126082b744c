//! Typed error taxonomy for the engine surface and the vendor seam, in
//! place of ad hoc `Result<(), String>` or treating a vendor exception as
//! a bare log line.

use thiserror::Error;

/// Errors surfaced to the caller by `Engine` operations. None of these are
/// fatal: the engine remains idle/armed-as-before on any of them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("mode conflict: requested {requested:?} but {active:?} is already active")]
    ModeConflict {
        requested: crate::engine::Mode,
        active: crate::engine::Mode,
    },

    #[error("no device attached")]
    NoDeviceAttached,
}

/// Error surface of the vendor `VendorImplant` trait. The vendor SDK's own
/// operations "may throw"; here that becomes a typed `Result`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VendorError {
    #[error("{0}")]
    Vendor(String),
}

impl VendorError {
    /// Renders the error the way the stim-time CSV log expects: `"0"` when
    /// there was none, the message text otherwise.
    pub fn as_log_text(result: &Result<(), VendorError>) -> String {
        match result {
            Ok(()) => "0".to_string(),
            Err(VendorError::Vendor(msg)) => msg.clone(),
        }
    }
}
