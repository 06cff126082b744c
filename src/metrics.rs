//! Ambient event recording: lock-free counters operators can snapshot for
//! visibility into queue drops, deadline misses, and stim fires without
//! touching the hot path.

use std::sync::atomic::{AtomicU64, Ordering};

/// An engine-lifetime event worth counting. Kept deliberately small — this
/// is a counter bank, not a full trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    NeuralQueueDropped,
    TelemetryQueueDropped,
    InterpolationGapDropped,
    StimFired,
    StimLogDropped,
    VendorException,
}

/// Lock-free counters, safe to update from the vendor callback thread.
#[derive(Default)]
pub struct Metrics {
    neural_dropped: AtomicU64,
    telemetry_dropped: AtomicU64,
    interpolation_gap_dropped: AtomicU64,
    stim_fired: AtomicU64,
    stim_log_dropped: AtomicU64,
    vendor_exceptions: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        let counter = match event {
            Event::NeuralQueueDropped => &self.neural_dropped,
            Event::TelemetryQueueDropped => &self.telemetry_dropped,
            Event::InterpolationGapDropped => &self.interpolation_gap_dropped,
            Event::StimFired => &self.stim_fired,
            Event::StimLogDropped => &self.stim_log_dropped,
            Event::VendorException => &self.vendor_exceptions,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            neural_dropped: self.neural_dropped.load(Ordering::Relaxed),
            telemetry_dropped: self.telemetry_dropped.load(Ordering::Relaxed),
            interpolation_gap_dropped: self.interpolation_gap_dropped.load(Ordering::Relaxed),
            stim_fired: self.stim_fired.load(Ordering::Relaxed),
            stim_log_dropped: self.stim_log_dropped.load(Ordering::Relaxed),
            vendor_exceptions: self.vendor_exceptions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub neural_dropped: u64,
    pub telemetry_dropped: u64,
    pub interpolation_gap_dropped: u64,
    pub stim_fired: u64,
    pub stim_log_dropped: u64,
    pub vendor_exceptions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment_independently() {
        let m = Metrics::new();
        m.record(Event::StimFired);
        m.record(Event::StimFired);
        m.record(Event::NeuralQueueDropped);
        let snap = m.snapshot();
        assert_eq!(snap.stim_fired, 2);
        assert_eq!(snap.neural_dropped, 1);
        assert_eq!(snap.telemetry_dropped, 0);
    }
}
