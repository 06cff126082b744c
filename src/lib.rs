//! Real-time ingest, DSP, and stimulation-trigger engine for a
//! Brain-Interchange implant bridge. Consumes a vendor SDK's callback
//! stream, runs a closed-loop phase-locked controller on every incoming
//! sample without starving the callback thread, and multiplexes
//! lower-rate telemetry to subscribed clients through bounded queues and
//! dedicated writer threads.
//!
//! Device discovery, the RPC surface, the vendor SDK itself, and CLI
//! wrappers are external collaborators; this crate defines the Rust-native
//! contracts at those seams ([`vendor::VendorImplant`],
//! [`vendor::StreamWriter`]) and implements everything behind them.

pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod interpolate;
pub mod metrics;
pub mod queue;
pub mod ring;
pub mod sample;
pub mod stim;
pub mod stream_pool;
pub mod telemetry;
pub mod vendor;

pub use config::{ClosedLoopConfig, EngineConfig, OpenLoopConfig};
pub use engine::{Engine, Mode};
pub use error::{EngineError, VendorError};
pub use sample::{EnrichedSample, Sample};
pub use telemetry::TelemetryMessage;
pub use vendor::{StreamWriter, VendorImplant};
