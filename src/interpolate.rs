//! Interpolator (C2): fills gaps in the measurement-counter sequence with
//! linear interpolation, subject to a configurable gap ceiling. Counter
//! arithmetic wraps at 32 bits, a repeated counter passes through with a
//! warning, and a gap past the ceiling is dropped rather than synthesized.

use crate::metrics::{Event, Metrics};
use crate::sample::{EnrichedSample, Sample, MAX_CHANNELS};
use log::warn;

pub struct Interpolator {
    last_counter: Option<u32>,
    latest_data: [f64; MAX_CHANNELS],
    ceiling: u32,
}

impl Interpolator {
    pub fn new(ceiling: u32) -> Self {
        Interpolator {
            last_counter: None,
            latest_data: [0.0; MAX_CHANNELS],
            ceiling,
        }
    }

    /// Wraparound gap: number of counters strictly between `last` and
    /// `current`, i.e. `current - last - 1` under 32-bit wrap.
    fn gap(last: u32, current: u32) -> u32 {
        current.wrapping_sub(last).wrapping_sub(1)
    }

    /// Feeds one raw sample through the interpolator. Returns the sequence
    /// of enriched samples to hand to the DSP chain (C3) in order: any
    /// synthesized interpolated samples, followed by the real sample.
    ///
    /// The very first sample seen has no predecessor and is passed through
    /// unmodified.
    pub fn process(&mut self, raw: Sample, metrics: &Metrics) -> Vec<EnrichedSample> {
        let Some(last) = self.last_counter else {
            self.last_counter = Some(raw.counter);
            self.latest_data = raw.values;
            return vec![EnrichedSample::from_raw(raw, false)];
        };

        let mut out = Vec::new();

        if raw.counter == last.wrapping_add(1) {
            // no gap
        } else if raw.counter == last {
            warn!("repeated measurement counter {}", raw.counter);
        } else {
            let gap = Self::gap(last, raw.counter);
            if gap <= self.ceiling {
                for i in 0..gap {
                    let mut values = [0.0; MAX_CHANNELS];
                    for ch in 0..raw.channel_count.max(1) {
                        let slope = (raw.values[ch] - self.latest_data[ch]) / (gap as f64 + 1.0);
                        values[ch] = self.latest_data[ch] + slope * (i as f64 + 1.0);
                    }
                    let synth = Sample {
                        counter: last.wrapping_add(1 + i),
                        values,
                        channel_count: raw.channel_count,
                        supply_voltage: raw.supply_voltage,
                        connected: raw.connected,
                        stimulation_id: raw.stimulation_id,
                        stimulation_active: raw.stimulation_active,
                        input_trigger_high: raw.input_trigger_high,
                        reception_timestamp_ns: raw.reception_timestamp_ns,
                    };
                    out.push(EnrichedSample::from_raw(synth, true));
                }
            } else {
                metrics.record(Event::InterpolationGapDropped);
                warn!(
                    "gap of {} samples exceeds interpolation ceiling {}, dropping",
                    gap, self.ceiling
                );
            }
        }

        self.last_counter = Some(raw.counter);
        self.latest_data = raw.values;
        out.push(EnrichedSample::from_raw(raw, false));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(counter: u32, value: f64) -> Sample {
        let mut values = [0.0; MAX_CHANNELS];
        values[0] = value;
        Sample {
            counter,
            values,
            channel_count: 1,
            supply_voltage: 3.3,
            connected: true,
            stimulation_id: 0,
            stimulation_active: false,
            input_trigger_high: false,
            reception_timestamp_ns: 1000,
        }
    }

    #[test]
    fn gap_within_ceiling_synthesizes_linear_interpolation() {
        let mut interp = Interpolator::new(10);
        let metrics = Metrics::new();
        interp.process(sample(10, 0.0), &metrics);
        let out = interp.process(sample(13, 30.0), &metrics);
        assert_eq!(out.len(), 3);
        assert!(out[0].is_interpolated);
        assert!(out[1].is_interpolated);
        assert!(!out[2].is_interpolated);
        assert_eq!(out[0].sample.counter, 11);
        assert!((out[0].sample.values[0] - 10.0).abs() < 1e-9);
        assert!((out[1].sample.values[0] - 20.0).abs() < 1e-9);
        assert_eq!(out[2].sample.counter, 13);
    }

    #[test]
    fn gap_beyond_ceiling_is_dropped_with_no_synthesis() {
        let mut interp = Interpolator::new(10);
        let metrics = Metrics::new();
        interp.process(sample(0, 0.0), &metrics);
        let out = interp.process(sample(16, 1.0), &metrics);
        assert_eq!(out.len(), 1);
        assert!(!out[0].is_interpolated);
        assert_eq!(out[0].sample.counter, 16);
        assert_eq!(metrics.snapshot().interpolation_gap_dropped, 1);
    }

    #[test]
    fn counter_wraparound_to_zero_is_not_a_gap() {
        let mut interp = Interpolator::new(10);
        let metrics = Metrics::new();
        interp.process(sample(u32::MAX, 0.0), &metrics);
        let out = interp.process(sample(0, 1.0), &metrics);
        assert_eq!(out.len(), 1);
        assert!(!out[0].is_interpolated);
    }

    #[test]
    fn repeated_counter_passes_through_with_warning() {
        let mut interp = Interpolator::new(10);
        let metrics = Metrics::new();
        interp.process(sample(5, 0.0), &metrics);
        let out = interp.process(sample(5, 1.0), &metrics);
        assert_eq!(out.len(), 1);
        assert!(!out[0].is_interpolated);
    }
}
