//! Configuration structs, replacing the source's hardcoded constants with
//! serde-deserializable, defaulted fields.

use serde::{Deserialize, Serialize};

/// Engine-wide configuration: queue capacities and the sample-rate
/// assumption baked into the phase estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Neural stream queue capacity (spec: 1000).
    pub neural_queue_capacity: usize,
    /// Non-neural telemetry stream queue capacity (spec: 100).
    pub telemetry_queue_capacity: usize,
    /// Maximum consecutive missing sample slots the interpolator will
    /// synthesize before dropping the gap.
    pub interpolation_ceiling: u32,
    /// Nominal sampling period assumed by the phase estimator. The source
    /// hardcodes `1/(sampDiff*0.001)`, an undocumented 1kHz assumption;
    /// here it is an explicit, overridable field defaulting to the same
    /// value.
    pub sample_period_secs: f64,
    /// Batch size the neural stream writer accumulates before flushing.
    pub neural_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            neural_queue_capacity: 1000,
            telemetry_queue_capacity: 100,
            interpolation_ceiling: 10,
            sample_period_secs: 0.001,
            neural_batch_size: 100,
        }
    }
}

/// Arming parameters for closed-loop (phase-triggered) stimulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedLoopConfig {
    pub sensing_channel: usize,
    /// IIR band-pass numerator coefficients, length 5.
    pub iir_b: [f64; 5],
    /// IIR band-pass denominator coefficients, length 5 (`a[0]` is 1).
    pub iir_a: [f64; 5],
    pub amplitude_threshold: f64,
    pub initial_trigger_phase: f64,
    pub target_phase: f64,
}

impl Default for ClosedLoopConfig {
    fn default() -> Self {
        ClosedLoopConfig {
            sensing_channel: 0,
            iir_b: [9.447e-4, 0.0, -1.889e-3, 0.0, 9.447e-4],
            iir_a: [1.0, -3.8610, 5.6398, -3.6932, 0.9150],
            amplitude_threshold: 10.0,
            initial_trigger_phase: 25.0,
            target_phase: 210.0,
        }
    }
}

/// Arming parameters for the open-loop watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenLoopConfig {
    /// Retrigger interval; enforced minimum of 10ms.
    pub watchdog_interval_ms: u64,
}

impl Default for OpenLoopConfig {
    fn default() -> Self {
        OpenLoopConfig {
            watchdog_interval_ms: 10,
        }
    }
}
