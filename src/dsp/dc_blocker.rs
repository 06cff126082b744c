//! DC blocker / artifact blanking stage (C3 step 1): a leaky-integrator DC
//! blocker that holds its last Hampel-filtered output during the
//! artifact-blanking window following a stimulation onset.

/// `stimInWindow` is `true` when a stim fired within the blanking window
/// (sum of the onset history is > 0).
pub fn compute(raw: f64, prev_raw: f64, prev_dc: f64, stim_in_window: bool, prev_hampel: f64) -> f64 {
    if stim_in_window {
        prev_hampel
    } else {
        0.945 * prev_dc + raw - prev_raw
    }
}
