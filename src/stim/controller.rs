//! Phase-Locked Stim Controller (C4): zero-crossing-driven trigger
//! predicate, adaptive trigger-phase adapter, onset bookkeeping, and
//! self-triggering lockout.

use crate::ring::{CounterRing, RingBuffer};

pub struct StimController {
    phase_history: RingBuffer<3>,
    stim_onset_history: RingBuffer<15>,
    stim_sample_stamps: CounterRing<4>,
    adaptive_trigger_phase: f64,
    target_phase: f64,
    self_trigger_lockout: bool,
    prev_stim_active: bool,
}

/// Result of one tick's evaluation, handed back to the orchestrator so it
/// can annotate the enriched sample and decide whether to wake C5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerTick {
    pub is_valid_target: bool,
    pub trigger_phase: f64,
}

impl StimController {
    pub fn new(initial_trigger_phase: f64, target_phase: f64) -> Self {
        StimController {
            phase_history: RingBuffer::new(),
            stim_onset_history: RingBuffer::new(),
            stim_sample_stamps: CounterRing::new(),
            adaptive_trigger_phase: initial_trigger_phase,
            target_phase,
            self_trigger_lockout: false,
            prev_stim_active: false,
        }
    }

    /// `sum(stimOnsetHistory) > 0`, consulted by the DSP chain's DC blocker
    /// before this tick's DSP run.
    pub fn stim_in_window(&self) -> bool {
        self.stim_onset_history.sum() > 0.0
    }

    pub fn adaptive_trigger_phase(&self) -> f64 {
        self.adaptive_trigger_phase
    }

    pub fn self_trigger_lockout(&self) -> bool {
        self.self_trigger_lockout
    }

    /// Evaluates the trigger predicate and runs onset bookkeeping for one
    /// tick: predicate first (read-only w.r.t. this tick's DSP output),
    /// onset bookkeeping after.
    pub fn evaluate(
        &mut self,
        phase: f64,
        bp0: f64,
        amplitude_threshold: f64,
        closed_loop_enabled: bool,
        stimulation_active: bool,
        counter: u32,
        mean_freq: f64,
    ) -> ControllerTick {
        self.phase_history.push_front(phase);

        self.clamp_for_comparison();
        let is_valid_target = !self.self_trigger_lockout
            && closed_loop_enabled
            && self.phase_history.get(0) > self.adaptive_trigger_phase
            && self.phase_history.get(2) < self.adaptive_trigger_phase
            && bp0 > amplitude_threshold;

        self.onset_bookkeeping(stimulation_active, phase, counter);
        self.update_self_trigger_lockout(mean_freq, counter);

        ControllerTick {
            is_valid_target,
            trigger_phase: self.adaptive_trigger_phase,
        }
    }

    /// Clamp applied at the point of comparison: `(0, 360]`, reset to 45°
    /// out of range. Kept distinct from `update_trigger_phase`'s own clamp
    /// per DESIGN.md's "double clamp" decision.
    fn clamp_for_comparison(&mut self) {
        if !(self.adaptive_trigger_phase > 0.0 && self.adaptive_trigger_phase <= 360.0) {
            self.adaptive_trigger_phase = 45.0;
        }
    }

    fn onset_bookkeeping(&mut self, stimulation_active: bool, observed_phase: f64, counter: u32) {
        if stimulation_active && !self.prev_stim_active {
            self.stim_onset_history.push_front(1.0);
            self.update_trigger_phase(observed_phase);
            self.stim_sample_stamps.push_front(counter);
            self.prev_stim_active = true;
        } else {
            self.stim_onset_history.push_front(0.0);
        }

        if !stimulation_active && self.prev_stim_active {
            self.prev_stim_active = false;
        }
    }

    /// Clamp applied here: `(1, 170]`, reset to 25° out of range.
    fn update_trigger_phase(&mut self, observed_phase_at_onset: f64) {
        let phase_diff = observed_phase_at_onset - self.target_phase;
        self.adaptive_trigger_phase -= 0.1 * phase_diff;
        if !(self.adaptive_trigger_phase > 1.0 && self.adaptive_trigger_phase <= 170.0) {
            self.adaptive_trigger_phase = 25.0;
        }
    }

    fn update_self_trigger_lockout(&mut self, mean_freq: f64, counter: u32) {
        if mean_freq > 0.0 {
            let self_trig_threshold = 1.25 * (1.0 / mean_freq) * 1000.0;
            let stamps = self.stim_sample_stamps.as_slice();
            let mut consecutive_within = 0;
            for i in 0..stamps.len() - 1 {
                let diff = stamps[i].wrapping_sub(stamps[i + 1]) as f64;
                if diff <= self_trig_threshold {
                    consecutive_within += 1;
                }
            }
            if consecutive_within >= stamps.len() - 1 {
                self.self_trigger_lockout = true;
            }
        }

        if self.self_trigger_lockout {
            let oldest = self.stim_sample_stamps.get(0);
            if counter.wrapping_sub(oldest) > 150 {
                self.self_trigger_lockout = false;
            }
        }
    }
}
