#![deny(missing_docs)]
#![doc = "Core data model shared by the mmbench crates: sweep configurations, trial outcomes, aggregated measurements and the canonical error type."]

pub mod errors;
pub mod provenance;
mod types;

pub use errors::{BenchError, ErrorInfo};
pub use provenance::SchemaVersion;
pub use types::{
    AggregatedMeasurement, ExperimentConfiguration, Measurement, ResultsTable, SweepKind,
    TrialFailure, TrialOutcome, Variant,
};
