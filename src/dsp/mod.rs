//! DSP Chain (C3): DC blocker -> Hampel outlier filter -> IIR band-pass ->
//! phase estimator, run once per tick on the sensing channel.

pub mod dc_blocker;
pub mod hampel;
pub mod iir;
pub mod phase;

use crate::ring::RingBuffer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DspOutput {
    pub filtered: f64,
    pub dc_out: f64,
    pub hampel_out: f64,
    pub phase: f64,
}

/// Owns every ring-buffer history the DSP chain needs across ticks.
/// Reset in full whenever closed-loop is (re)armed.
pub struct DspChain {
    iir_b: [f64; 5],
    iir_a: [f64; 5],
    sample_period_secs: f64,

    raw_history: RingBuffer<15>,
    dc_history: RingBuffer<15>,
    hampel_history: RingBuffer<15>,
    bp_history: RingBuffer<5>,
    sig_freq_history: RingBuffer<4>,
    zero_sample_counter: u32,
}

impl DspChain {
    pub fn new(iir_b: [f64; 5], iir_a: [f64; 5], sample_period_secs: f64) -> Self {
        DspChain {
            iir_b,
            iir_a,
            sample_period_secs,
            raw_history: RingBuffer::new(),
            dc_history: RingBuffer::new(),
            hampel_history: RingBuffer::new(),
            bp_history: RingBuffer::new(),
            sig_freq_history: RingBuffer::new(),
            zero_sample_counter: 0,
        }
    }

    /// Clears every history; used when closed-loop is re-armed.
    pub fn reset(&mut self) {
        *self = DspChain::new(self.iir_b, self.iir_a, self.sample_period_secs);
    }

    /// `bp_history[0]` after this call, needed by the stim controller's
    /// trigger predicate and self-trigger lockout checks.
    pub fn bp_current(&self) -> f64 {
        self.bp_history.get(0)
    }

    /// Mean of the accumulated plausible-frequency history; feeds the stim
    /// controller's self-triggering threshold.
    pub fn mean_sig_freq(&self) -> f64 {
        let slice = self.sig_freq_history.as_slice();
        slice.iter().sum::<f64>() / slice.len() as f64
    }

    /// Runs all four stages for one tick. `stim_in_window` is the caller's
    /// `sum(stimOnsetHistory) > 0` (owned by the stim controller, read-only
    /// here) and gates the DC blanking rule.
    pub fn process(&mut self, raw: f64, stim_in_window: bool, counter: u32) -> DspOutput {
        let prev_raw = self.raw_history.get(0);
        let prev_dc = self.dc_history.get(0);
        let prev_hampel = self.hampel_history.get(0);

        let dc = dc_blocker::compute(raw, prev_raw, prev_dc, stim_in_window, prev_hampel);
        self.raw_history.push_front(raw);
        self.dc_history.push_front(dc);

        let hampel_out = hampel::compute(self.dc_history.as_slice());
        self.hampel_history.push_front(hampel_out);

        let x1 = self.hampel_history.get(1);
        let x2 = self.hampel_history.get(2);
        let x3 = self.hampel_history.get(3);
        let x4 = self.hampel_history.get(4);
        let y1 = self.bp_history.get(0);
        let y2 = self.bp_history.get(1);
        let y3 = self.bp_history.get(2);
        let y4 = self.bp_history.get(3);
        let bp = iir::compute(&self.iir_b, &self.iir_a, hampel_out, x1, x2, x3, x4, y1, y2, y3, y4);
        self.bp_history.push_front(bp);

        let bp0 = self.bp_history.get(0);
        let bp1 = self.bp_history.get(1);
        let phase = phase::compute(
            bp0,
            bp1,
            counter,
            &mut self.zero_sample_counter,
            &mut self.sig_freq_history,
            self.sample_period_secs,
        );

        DspOutput {
            filtered: bp,
            dc_out: dc,
            hampel_out,
            phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_chain() -> DspChain {
        DspChain::new(
            [9.447e-4, 0.0, -1.889e-3, 0.0, 9.447e-4],
            [1.0, -3.8610, 5.6398, -3.6932, 0.9150],
            0.001,
        )
    }

    #[test]
    fn all_zero_input_drives_all_outputs_to_zero() {
        let mut chain = default_chain();
        let mut out = DspOutput { filtered: 0.0, dc_out: 0.0, hampel_out: 0.0, phase: 0.0 };
        for n in 0..20u32 {
            out = chain.process(0.0, false, n);
        }
        assert_eq!(out.filtered, 0.0);
        assert_eq!(out.dc_out, 0.0);
        assert_eq!(out.hampel_out, 0.0);
        assert_eq!(out.phase, 0.0);
    }

    #[test]
    fn stim_blanking_window_holds_dc_output() {
        let mut chain = default_chain();
        chain.process(5.0, false, 0);
        let out = chain.process(7.0, true, 1);
        assert_eq!(out.dc_out, chain.hampel_history.get(1));
    }

    #[test]
    fn reset_clears_histories() {
        let mut chain = default_chain();
        for n in 0..10u32 {
            chain.process(3.0, false, n);
        }
        chain.reset();
        assert_eq!(chain.bp_current(), 0.0);
    }
}
