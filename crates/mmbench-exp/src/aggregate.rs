use mmbench_core::{AggregatedMeasurement, ExperimentConfiguration, Measurement, TrialOutcome};

/// Completion time of a fork-join trial: the slowest worker's duration.
pub fn max_duration(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Reduces the trials of one configuration to its summary row.
///
/// Failed trials are counted in `trials` but excluded from the mean. When no
/// trial succeeded the measurement is [`Measurement::Unavailable`], never zero.
pub fn aggregate(
    configuration: ExperimentConfiguration,
    outcomes: &[TrialOutcome],
) -> AggregatedMeasurement {
    let durations: Vec<f64> = outcomes.iter().filter_map(TrialOutcome::duration_ms).collect();
    let measurement = match mean(&durations) {
        Some(mean_ms) => Measurement::Available { mean_ms },
        None => Measurement::Unavailable,
    };
    AggregatedMeasurement {
        configuration,
        measurement,
        trials: count(outcomes.len()),
        successful_trials: count(durations.len()),
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
