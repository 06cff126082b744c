//! Hampel outlier filter (C3 step 2): median-absolute-deviation outlier
//! replacement over the 15-sample DC-blocker history. Sorts a copy of the
//! history to find the median, computes `1.4826 * MAD`, and replaces the
//! current sample with the median when it deviates by more than `3 * MAD`.

/// `history` must already contain the current DC-blocker output at index 0
/// (length 15, newest-first). Returns the Hampel-filtered output for this
/// tick.
pub fn compute(history: &[f64; 15]) -> f64 {
    let current = history[0];

    let mut sorted = *history;
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = sorted[((history.len() - 1) / 2) + 1];

    let mut deviations: Vec<f64> = history.iter().map(|v| (v - median).abs()).collect();
    deviations.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mad = 1.4826 * deviations[((deviations.len() - 1) / 2) + 1];

    if (current - median).abs() <= 3.0 * mad {
        current
    } else {
        median
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_when_within_threshold() {
        let history = [1.0; 15];
        assert_eq!(compute(&history), 1.0);
    }

    #[test]
    fn replaces_outlier_with_median() {
        let mut history = [1.0; 15];
        history[0] = 500.0;
        assert_eq!(compute(&history), 1.0);
    }

    #[test]
    fn all_zero_input_stays_zero() {
        let history = [0.0; 15];
        assert_eq!(compute(&history), 0.0);
    }
}
