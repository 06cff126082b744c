//! Contracts at the engine's two seams: the upstream vendor implant driver
//! and the downstream RPC writer. Both are external collaborators — this
//! module only defines the traits the rest of the crate is built against.

use crate::error::VendorError;

/// Upstream contract with the vendor implant driver. All operations are
/// blocking; the driver owns the callback thread and calls into the
/// engine, not the other way around.
pub trait VendorImplant: Send + Sync {
    fn start_measurement(&self, reference_channel_set: &[usize]) -> Result<(), VendorError>;
    fn stop_measurement(&self) -> Result<(), VendorError>;

    /// May fail; a failed attempt is surfaced as a typed error rather than
    /// an exception.
    fn start_stimulation(&self) -> Result<(), VendorError>;
    fn stop_stimulation(&self) -> Result<(), VendorError>;

    fn get_impedance(&self, channel: usize) -> Result<f64, VendorError>;
    fn get_temperature(&self) -> Result<f64, VendorError>;
    fn get_humidity(&self) -> Result<f64, VendorError>;
    fn set_implant_power(&self, on: bool) -> Result<(), VendorError>;

    /// Whether the implant is currently mid-stimulation; polled by the
    /// open-loop watchdog's wait loop and checked under the engine lock
    /// before a trigger path issues a new fire.
    fn is_stimulating(&self) -> bool;
}

/// Downstream contract with a subscribed client: one write operation per
/// stream kind. `T` is the stream's payload type (a telemetry message, or
/// a batched neural update).
pub trait StreamWriter<T>: Send {
    fn write(&self, msg: T) -> Result<(), WriterError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct WriterError(pub String);
