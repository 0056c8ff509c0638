use std::fmt;

use serde::{Deserialize, Serialize};

/// Algorithm variant under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Single threaded reference program, timed by the invoker.
    Sequential,
    /// Thread-based program whose workers write `thread_*` result files.
    ThreadParallel,
    /// Process-based program whose workers write `proc_*` result files.
    ProcessParallel,
}

impl Variant {
    /// Every variant in report order.
    pub const ALL: [Variant; 3] = [
        Variant::Sequential,
        Variant::ThreadParallel,
        Variant::ProcessParallel,
    ];

    /// The self-reporting variants in report order.
    pub const PARALLEL: [Variant; 2] = [Variant::ThreadParallel, Variant::ProcessParallel];

    /// Returns `true` when the variant reports its timing through result files.
    pub fn is_parallel(self) -> bool {
        !matches!(self, Variant::Sequential)
    }

    /// Short label used in tables and chart legends.
    pub fn label(self) -> &'static str {
        match self {
            Variant::Sequential => "Sequential",
            Variant::ThreadParallel => "Threads",
            Variant::ProcessParallel => "Process",
        }
    }

    /// Parses either a table label or the kebab-case serde name.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Sequential" | "sequential" => Some(Variant::Sequential),
            "Threads" | "threads" | "thread-parallel" => Some(Variant::ThreadParallel),
            "Process" | "process" | "process-parallel" => Some(Variant::ProcessParallel),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifies one of the two sweeps of an experiment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepKind {
    /// E1: matrix size varies, every variant runs.
    Size,
    /// E2: granularity varies at a fixed size, parallel variants only.
    Granularity,
}

impl SweepKind {
    /// Experiment identifier used in file names and logs.
    pub fn id(self) -> &'static str {
        match self {
            SweepKind::Size => "E1",
            SweepKind::Granularity => "E2",
        }
    }

    /// Name of the column holding the swept value.
    pub fn key_column(self) -> &'static str {
        match self {
            SweepKind::Size => "size",
            SweepKind::Granularity => "granularity",
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One fixed (size, variant, granularity) tuple together with its repetition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentConfiguration {
    size: u32,
    variant: Variant,
    granularity: u64,
    repetitions: u32,
}

impl ExperimentConfiguration {
    /// Creates a configuration with an explicit granularity parameter.
    pub fn new(size: u32, variant: Variant, granularity: u64, repetitions: u32) -> Self {
        Self {
            size,
            variant,
            granularity,
            repetitions,
        }
    }

    /// Creates a size-sweep configuration whose granularity is derived from `size`.
    pub fn for_size(size: u32, variant: Variant, repetitions: u32) -> Self {
        Self::new(size, variant, Self::derived_granularity(size), repetitions)
    }

    /// Granularity used by the size sweep: `ceil(size² / 8)`.
    pub fn derived_granularity(size: u32) -> u64 {
        let cells = u64::from(size) * u64::from(size);
        cells.div_ceil(8)
    }

    /// Matrix dimension N (matrices are N x N).
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Variant under test.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Granularity parameter P handed to parallel programs.
    pub fn granularity(&self) -> u64 {
        self.granularity
    }

    /// Number of trials R executed for this configuration.
    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    /// Value of the swept dimension for the given sweep.
    pub fn key(&self, kind: SweepKind) -> u64 {
        match kind {
            SweepKind::Size => u64::from(self.size),
            SweepKind::Granularity => self.granularity,
        }
    }
}

impl fmt::Display for ExperimentConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{n}x{n} {variant} P={p} R={r}",
            n = self.size,
            variant = self.variant,
            p = self.granularity,
            r = self.repetitions
        )
    }
}

/// Reason a single trial did not yield a duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum TrialFailure {
    /// The program exited with a non-zero status code.
    NonZeroExit {
        /// Exit code reported by the operating system.
        code: i32,
    },
    /// The program was terminated by a signal.
    Signalled,
    /// The program exceeded the per-trial timeout and was killed.
    TimedOut {
        /// Configured limit in milliseconds.
        limit_ms: u64,
    },
    /// The program could not be started or waited on.
    Spawn {
        /// Operating system diagnostic.
        detail: String,
    },
    /// No worker produced a parseable timing file.
    NoTimingArtifact,
    /// Result files of an earlier trial could not be removed.
    StaleArtifacts {
        /// Diagnostic from the cleanup step.
        detail: String,
    },
    /// The input matrices for this size could not be generated.
    MatrixGeneration,
}

impl fmt::Display for TrialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialFailure::NonZeroExit { code } => write!(f, "exited with status {code}"),
            TrialFailure::Signalled => write!(f, "terminated by signal"),
            TrialFailure::TimedOut { limit_ms } => write!(f, "timed out after {limit_ms}ms"),
            TrialFailure::Spawn { detail } => write!(f, "failed to spawn: {detail}"),
            TrialFailure::NoTimingArtifact => write!(f, "no parseable timing artifact"),
            TrialFailure::StaleArtifacts { detail } => {
                write!(f, "stale result files not cleared: {detail}")
            }
            TrialFailure::MatrixGeneration => write!(f, "matrix generation failed"),
        }
    }
}

/// Result of one execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TrialOutcome {
    /// The trial completed and produced a duration in milliseconds.
    Succeeded {
        /// Duration in milliseconds.
        duration_ms: f64,
    },
    /// The trial failed and is excluded from aggregation.
    Failed {
        /// Why the trial failed.
        failure: TrialFailure,
    },
}

impl TrialOutcome {
    /// Successful trial with the given duration in milliseconds.
    pub fn succeeded(duration_ms: f64) -> Self {
        TrialOutcome::Succeeded { duration_ms }
    }

    /// Failed trial with the given reason.
    pub fn failed(failure: TrialFailure) -> Self {
        TrialOutcome::Failed { failure }
    }

    /// Returns `true` for successful trials.
    pub fn is_success(&self) -> bool {
        matches!(self, TrialOutcome::Succeeded { .. })
    }

    /// Duration of a successful trial.
    pub fn duration_ms(&self) -> Option<f64> {
        match self {
            TrialOutcome::Succeeded { duration_ms } => Some(*duration_ms),
            TrialOutcome::Failed { .. } => None,
        }
    }

    /// Failure reason of a failed trial.
    pub fn failure(&self) -> Option<&TrialFailure> {
        match self {
            TrialOutcome::Succeeded { .. } => None,
            TrialOutcome::Failed { failure } => Some(failure),
        }
    }
}

/// Summary statistic for one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Measurement {
    /// Arithmetic mean over the successful trials.
    Available {
        /// Mean duration in milliseconds.
        mean_ms: f64,
    },
    /// No trial succeeded; there is no meaningful value.
    Unavailable,
}

impl Measurement {
    /// Mean duration if available.
    pub fn mean_ms(&self) -> Option<f64> {
        match self {
            Measurement::Available { mean_ms } => Some(*mean_ms),
            Measurement::Unavailable => None,
        }
    }

    /// Returns `true` when a mean exists.
    pub fn is_available(&self) -> bool {
        matches!(self, Measurement::Available { .. })
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Available { mean_ms } => write!(f, "{mean_ms:.3}ms"),
            Measurement::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Aggregated result for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMeasurement {
    /// Configuration that was measured.
    pub configuration: ExperimentConfiguration,
    /// Mean over successful trials, or unavailable.
    pub measurement: Measurement,
    /// Number of trial outcomes fed to the aggregator.
    pub trials: u32,
    /// Number of those trials that succeeded.
    pub successful_trials: u32,
}

/// Ordered rows produced by one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    /// Sweep that produced the rows.
    pub kind: SweepKind,
    /// One row per explored configuration, in exploration order.
    pub rows: Vec<AggregatedMeasurement>,
}

impl ResultsTable {
    /// Creates an empty table for the given sweep.
    pub fn new(kind: SweepKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn push(&mut self, row: AggregatedMeasurement) {
        self.rows.push(row);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows whose measurement is unavailable.
    pub fn unavailable_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| !row.measurement.is_available())
            .count()
    }

    /// Variants present in the table, in [`Variant::ALL`] order.
    pub fn variants(&self) -> Vec<Variant> {
        Variant::ALL
            .into_iter()
            .filter(|variant| {
                self.rows
                    .iter()
                    .any(|row| row.configuration.variant() == *variant)
            })
            .collect()
    }

    /// `(swept value, measurement)` pairs for one variant, sorted by swept value.
    pub fn series(&self, variant: Variant) -> Vec<(u64, Measurement)> {
        let mut points: Vec<(u64, Measurement)> = self
            .rows
            .iter()
            .filter(|row| row.configuration.variant() == variant)
            .map(|row| (row.configuration.key(self.kind), row.measurement))
            .collect();
        points.sort_by_key(|(key, _)| *key);
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_granularity_rounds_up() {
        assert_eq!(ExperimentConfiguration::derived_granularity(100), 1250);
        assert_eq!(ExperimentConfiguration::derived_granularity(800), 80000);
        assert_eq!(ExperimentConfiguration::derived_granularity(3), 2);
        assert_eq!(ExperimentConfiguration::derived_granularity(1), 1);
    }

    #[test]
    fn key_follows_sweep_kind() {
        let config = ExperimentConfiguration::new(800, Variant::ProcessParallel, 20000, 10);
        assert_eq!(config.key(SweepKind::Size), 800);
        assert_eq!(config.key(SweepKind::Granularity), 20000);
    }

    #[test]
    fn series_is_sorted_and_filtered() {
        let mut table = ResultsTable::new(SweepKind::Size);
        for (size, variant) in [
            (400, Variant::Sequential),
            (100, Variant::Sequential),
            (100, Variant::ThreadParallel),
        ] {
            table.push(AggregatedMeasurement {
                configuration: ExperimentConfiguration::for_size(size, variant, 1),
                measurement: Measurement::Unavailable,
                trials: 1,
                successful_trials: 0,
            });
        }
        let keys: Vec<u64> = table
            .series(Variant::Sequential)
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec![100, 400]);
        assert_eq!(
            table.variants(),
            vec![Variant::Sequential, Variant::ThreadParallel]
        );
        assert_eq!(table.unavailable_count(), 3);
    }

    #[test]
    fn variant_labels_roundtrip() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_label(variant.label()), Some(variant));
        }
        assert_eq!(Variant::from_label("bogus"), None);
    }
}
