use std::path::{Path, PathBuf};

use mmbench_core::errors::{BenchError, ErrorInfo};
use mmbench_core::{
    AggregatedMeasurement, ExperimentConfiguration, ResultsTable, SweepKind, TrialFailure,
    TrialOutcome, Variant,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::aggregate;
use crate::config::{ExperimentConfig, ProgramPaths};
use crate::harvest::TimingCollector;
use crate::invoker::ProgramRunner;
use crate::registry::SweepRegistry;

/// Lifecycle of an experiment run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverState {
    Idle,
    SweepingSize,
    SweepingGranularity,
    Reporting,
    Done,
}

/// Results tables of both sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResults {
    pub size_sweep: ResultsTable,
    pub granularity_sweep: ResultsTable,
}

impl ExperimentResults {
    /// Table of the requested sweep.
    pub fn table(&self, kind: SweepKind) -> &ResultsTable {
        match kind {
            SweepKind::Size => &self.size_sweep,
            SweepKind::Granularity => &self.granularity_sweep,
        }
    }
}

/// Consumer of finalized results, invoked once in [`DriverState::Reporting`].
pub trait ReportSink {
    fn emit(&mut self, results: &ExperimentResults) -> Result<(), BenchError>;
}

/// Resolved program and matrix locations the driver hands to each trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramLayout {
    pub programs: ProgramPaths,
    pub matrix_a: PathBuf,
    pub matrix_b: PathBuf,
}

impl ProgramLayout {
    /// Resolves every configured path against the project root.
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            programs: ProgramPaths {
                generator: config.resolve(&config.programs.generator),
                sequential: config.resolve(&config.programs.sequential),
                threads: config.resolve(&config.programs.threads),
                process: config.resolve(&config.programs.process),
            },
            matrix_a: config.resolve(&config.paths.matrix_a),
            matrix_b: config.resolve(&config.paths.matrix_b),
        }
    }

    /// Arguments of one trial: both matrix files, plus P for parallel variants.
    pub fn trial_args(&self, configuration: &ExperimentConfiguration) -> Vec<String> {
        let mut args = vec![path_arg(&self.matrix_a), path_arg(&self.matrix_b)];
        if configuration.variant().is_parallel() {
            args.push(configuration.granularity().to_string());
        }
        args
    }

    /// Arguments of the generator for square `size` x `size` inputs.
    pub fn generator_args(&self, size: u32) -> Vec<String> {
        vec![size.to_string(); 4]
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Orchestrates the size sweep followed by the granularity sweep.
///
/// Trials run strictly one after another: the result directory is shared by
/// every worker, so a parallel trial is always `clear`, `run`, `collect_max`
/// with nothing interleaved.
pub struct ExperimentDriver<R, C> {
    layout: ProgramLayout,
    registry: SweepRegistry,
    runner: R,
    collector: C,
    state: DriverState,
    generated_size: Option<u32>,
}

impl<R: ProgramRunner, C: TimingCollector> ExperimentDriver<R, C> {
    pub fn new(layout: ProgramLayout, registry: SweepRegistry, runner: R, collector: C) -> Self {
        Self {
            layout,
            registry,
            runner,
            collector,
            state: DriverState::Idle,
            generated_size: None,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn registry(&self) -> &SweepRegistry {
        &self.registry
    }

    /// Runs both sweeps, hands the results to `sink` and finishes in
    /// [`DriverState::Done`]. Configuration failures never abort a sweep.
    pub fn run(&mut self, sink: &mut dyn ReportSink) -> Result<ExperimentResults, BenchError> {
        if self.state != DriverState::Idle {
            return Err(BenchError::Config(
                ErrorInfo::new("driver-state", "experiment driver has already run")
                    .with_context("state", format!("{:?}", self.state)),
            ));
        }
        self.state = DriverState::SweepingSize;
        let size_sweep = self.run_sweep(SweepKind::Size);
        self.state = DriverState::SweepingGranularity;
        let granularity_sweep = self.run_sweep(SweepKind::Granularity);
        let results = ExperimentResults {
            size_sweep,
            granularity_sweep,
        };
        self.state = DriverState::Reporting;
        sink.emit(&results)?;
        self.state = DriverState::Done;
        Ok(results)
    }

    /// Executes every configuration of one sweep in registry order.
    pub fn run_sweep(&mut self, kind: SweepKind) -> ResultsTable {
        let configurations = self.registry.sweep(kind).to_vec();
        info!(sweep = %kind, configurations = configurations.len(), "starting sweep");
        let mut table = ResultsTable::new(kind);
        for configuration in configurations {
            table.push(self.run_configuration(&configuration));
        }
        info!(
            sweep = %kind,
            rows = table.len(),
            unavailable = table.unavailable_count(),
            "sweep finished"
        );
        table
    }

    /// Runs all R trials of one configuration and aggregates them.
    pub fn run_configuration(
        &mut self,
        configuration: &ExperimentConfiguration,
    ) -> AggregatedMeasurement {
        let repetitions = configuration.repetitions() as usize;
        let outcomes: Vec<TrialOutcome> = if self.ensure_matrices(configuration.size()) {
            (0..repetitions)
                .map(|trial| {
                    let outcome = self.run_trial(configuration);
                    match outcome.failure() {
                        Some(failure) => {
                            warn!(%configuration, trial, %failure, "trial failed")
                        }
                        None => debug!(
                            %configuration,
                            trial,
                            duration_ms = outcome.duration_ms(),
                            "trial finished"
                        ),
                    }
                    outcome
                })
                .collect()
        } else {
            vec![TrialOutcome::failed(TrialFailure::MatrixGeneration); repetitions]
        };
        let row = aggregate(*configuration, &outcomes);
        info!(
            %configuration,
            measurement = %row.measurement,
            successful = row.successful_trials,
            trials = row.trials,
            "configuration aggregated"
        );
        row
    }

    /// Executes a single trial.
    pub fn run_trial(&self, configuration: &ExperimentConfiguration) -> TrialOutcome {
        let variant = configuration.variant();
        let program = self.layout.programs.for_variant(variant);
        let args = self.layout.trial_args(configuration);
        if !variant.is_parallel() {
            return self.runner.run(program, &args);
        }
        if let Err(err) = self.collector.clear(variant) {
            return TrialOutcome::failed(TrialFailure::StaleArtifacts {
                detail: err.to_string(),
            });
        }
        let invocation = self.runner.run(program, &args);
        if !invocation.is_success() {
            return invocation;
        }
        self.harvest(variant)
    }

    fn harvest(&self, variant: Variant) -> TrialOutcome {
        match self.collector.collect_max(variant) {
            Ok(Some(duration_ms)) => TrialOutcome::succeeded(duration_ms),
            Ok(None) => TrialOutcome::failed(TrialFailure::NoTimingArtifact),
            Err(err) => {
                warn!(variant = %variant, error = %err, "failed to harvest result files");
                TrialOutcome::failed(TrialFailure::NoTimingArtifact)
            }
        }
    }

    /// Generates the input matrices unless the last generation used `size`.
    fn ensure_matrices(&mut self, size: u32) -> bool {
        if self.generated_size == Some(size) {
            return true;
        }
        self.generated_size = None;
        info!(size, "generating input matrices");
        let outcome = self
            .runner
            .run(&self.layout.programs.generator, &self.layout.generator_args(size));
        match outcome.failure() {
            None => {
                self.generated_size = Some(size);
                true
            }
            Some(failure) => {
                warn!(size, %failure, "matrix generation failed; configuration marked unavailable");
                false
            }
        }
    }
}
