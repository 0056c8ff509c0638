use mmbench_core::{ExperimentConfiguration, SweepKind, Variant};

use crate::config::ExperimentConfig;

/// Immutable, ordered sweep definitions handed to the driver.
///
/// The registry owns the expanded configurations for both sweeps so that the
/// driver never consults global state and alternative sweep shapes can be
/// tested in isolation.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRegistry {
    size_sweep: Vec<ExperimentConfiguration>,
    granularity_sweep: Vec<ExperimentConfiguration>,
}

impl SweepRegistry {
    /// Expands both sweeps from a configuration.
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self::new(
            &config.size_sweep.sizes,
            config.granularity_sweep.size,
            &config.granularity_sweep.values,
            config.repetitions,
        )
    }

    /// Expands both sweeps from explicit value lists.
    ///
    /// E1 pairs every size with every variant, size-major. E2 pairs every
    /// granularity value with both parallel variants at the fixed size,
    /// granularity-major.
    pub fn new(sizes: &[u32], fixed_size: u32, granularities: &[u64], repetitions: u32) -> Self {
        let size_sweep = sizes
            .iter()
            .flat_map(|&size| {
                Variant::ALL.into_iter().map(move |variant| {
                    ExperimentConfiguration::for_size(size, variant, repetitions)
                })
            })
            .collect();
        let granularity_sweep = granularities
            .iter()
            .flat_map(|&granularity| {
                Variant::PARALLEL.into_iter().map(move |variant| {
                    ExperimentConfiguration::new(fixed_size, variant, granularity, repetitions)
                })
            })
            .collect();
        Self {
            size_sweep,
            granularity_sweep,
        }
    }

    /// Ordered configurations of the size sweep (E1).
    pub fn size_sweep(&self) -> &[ExperimentConfiguration] {
        &self.size_sweep
    }

    /// Ordered configurations of the granularity sweep (E2).
    pub fn granularity_sweep(&self) -> &[ExperimentConfiguration] {
        &self.granularity_sweep
    }

    /// Configurations of the requested sweep.
    pub fn sweep(&self, kind: SweepKind) -> &[ExperimentConfiguration] {
        match kind {
            SweepKind::Size => self.size_sweep(),
            SweepKind::Granularity => self.granularity_sweep(),
        }
    }

    /// Total number of trials both sweeps will execute.
    pub fn total_trials(&self) -> u64 {
        self.size_sweep
            .iter()
            .chain(self.granularity_sweep.iter())
            .map(|config| u64::from(config.repetitions()))
            .sum()
    }
}
