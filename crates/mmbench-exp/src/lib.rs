//! Experiment orchestration for the matrix multiplication benchmark.
//!
//! The driver walks the size sweep (E1) and the granularity sweep (E2),
//! runs every trial through a [`ProgramRunner`], harvests the self-reported
//! worker timings of the parallel variants through a [`TimingCollector`] and
//! hands the aggregated tables to a [`ReportSink`].

mod aggregate;
mod build_step;
mod canonical;
mod config;
mod driver;
mod export;
mod harvest;
mod invoker;
mod registry;
mod report;
mod runbook;

pub use aggregate::{aggregate, max_duration, mean};
pub use build_step::ensure_built;
pub use canonical::{canonical_digest, to_canonical_json_bytes};
pub use config::{
    ArtifactConfig, BuildConfig, DataPaths, ExperimentConfig, GranularitySweepConfig,
    ProgramPaths, SizeSweepConfig,
};
pub use driver::{DriverState, ExperimentDriver, ExperimentResults, ProgramLayout, ReportSink};
pub use export::{read_results_csv, table_columns, write_results_csv, UNAVAILABLE};
pub use harvest::{parse_duration, ArtifactHarvester, TimingCollector};
pub use invoker::{duration_ms, Invoker, ProgramRunner};
pub use registry::SweepRegistry;
pub use report::{chart_config, chart_file_name, table_file_name, ReportEmitter};
pub use runbook::{build_runbook, write_runbook, RunBook, SweepSummary};
