//! Ingest Orchestrator (C7): the vendor callback's landing zone. Wires
//! C2 (interpolation) -> C3 (DSP chain) -> C4 (stim controller) for every
//! sample in a batch, in order.

use crate::dsp::DspChain;
use crate::interpolate::Interpolator;
use crate::metrics::Metrics;
use crate::sample::EnrichedSample;
use crate::stim::controller::StimController;

/// All state the vendor callback thread mutates while processing a batch.
/// Held behind one lock by the engine for the full span of one sample's
/// processing.
pub struct IngestState {
    interpolator: Interpolator,
    dsp: DspChain,
    controller: StimController,
    pub sensing_channel: usize,
    pub amplitude_threshold: f64,
}

/// One emitted sample plus whether it should wake the stim executor.
pub struct IngestTick {
    pub enriched: EnrichedSample,
    pub should_fire: bool,
}

impl IngestState {
    pub fn new(ceiling: u32, dsp: DspChain, controller: StimController) -> Self {
        IngestState {
            interpolator: Interpolator::new(ceiling),
            dsp,
            controller,
            sensing_channel: 0,
            amplitude_threshold: 10.0,
        }
    }

    /// Replaces the DSP chain and controller wholesale — used when closed
    /// loop is (re)armed, resetting every DSP/controller history.
    pub fn rearm(&mut self, dsp: DspChain, controller: StimController, sensing_channel: usize, amplitude_threshold: f64) {
        self.dsp = dsp;
        self.controller = controller;
        self.sensing_channel = sensing_channel;
        self.amplitude_threshold = amplitude_threshold;
    }

    pub fn adaptive_trigger_phase(&self) -> f64 {
        self.controller.adaptive_trigger_phase()
    }

    /// Runs one raw sample through C2, then C3 and C4 for every sample it
    /// emits (interpolated or real). `closed_loop_enabled` gates the
    /// trigger predicate but not the DSP computation itself — the phase
    /// estimate and histories stay warm whether or not closed loop is
    /// armed.
    pub fn process(&mut self, raw: crate::sample::Sample, closed_loop_enabled: bool, metrics: &Metrics) -> Vec<IngestTick> {
        let emitted = self.interpolator.process(raw, metrics);
        let mut out = Vec::with_capacity(emitted.len());

        for mut enriched in emitted {
            let channel = self.sensing_channel.min(enriched.sample.channel_count.saturating_sub(1));
            let sensing_value = enriched.sample.values[channel];
            let stim_in_window = self.controller.stim_in_window();
            let dsp_out = self.dsp.process(sensing_value, stim_in_window, enriched.sample.counter);

            enriched.filtered = dsp_out.filtered;
            enriched.dc_out = dsp_out.dc_out;
            enriched.hampel_out = dsp_out.hampel_out;
            enriched.phase = dsp_out.phase;

            let mean_freq = self.dsp.mean_sig_freq();
            let tick = self.controller.evaluate(
                dsp_out.phase,
                dsp_out.filtered,
                self.amplitude_threshold,
                closed_loop_enabled,
                enriched.sample.stimulation_active,
                enriched.sample.counter,
                mean_freq,
            );
            enriched.is_valid_target = tick.is_valid_target;
            enriched.trigger_phase = tick.trigger_phase;

            out.push(IngestTick {
                should_fire: tick.is_valid_target,
                enriched,
            });
        }

        out
    }
}
