use std::fs;
use std::path::{Path, PathBuf};

use mmbench_core::errors::{BenchError, ErrorInfo};
use mmbench_core::{SchemaVersion, SweepKind};
use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_digest, to_canonical_json_bytes};
use crate::config::ExperimentConfig;
use crate::driver::ExperimentResults;
use crate::export::ensure_parent;

/// Row counts of one sweep as recorded in the runbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub sweep: SweepKind,
    pub rows: usize,
    pub unavailable: usize,
}

/// Reproducibility record written next to the exported tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunBook {
    pub schema_version: SchemaVersion,
    /// Hash of the canonical configuration; equal configurations share an id.
    pub id: String,
    pub created_at: String,
    pub config: ExperimentConfig,
    pub artifacts: Vec<String>,
    pub sweeps: Vec<SweepSummary>,
}

/// Builds the runbook for a finished run.
pub fn build_runbook(
    config: &ExperimentConfig,
    results: &ExperimentResults,
    artifacts: &[PathBuf],
    created_at: impl Into<String>,
) -> Result<RunBook, BenchError> {
    let id = canonical_digest(config)?;
    let sweeps = [SweepKind::Size, SweepKind::Granularity]
        .into_iter()
        .map(|kind| {
            let table = results.table(kind);
            SweepSummary {
                sweep: kind,
                rows: table.len(),
                unavailable: table.unavailable_count(),
            }
        })
        .collect();
    Ok(RunBook {
        schema_version: SchemaVersion::default(),
        id,
        created_at: created_at.into(),
        config: config.clone(),
        artifacts: artifacts
            .iter()
            .map(|path| path.to_string_lossy().to_string())
            .collect(),
        sweeps,
    })
}

/// Persists the runbook as canonical JSON.
pub fn write_runbook(path: &Path, runbook: &RunBook) -> Result<(), BenchError> {
    ensure_parent(path)?;
    let bytes = to_canonical_json_bytes(runbook)?;
    fs::write(path, bytes).map_err(|err| {
        BenchError::Report(
            ErrorInfo::new("runbook-write", "failed to write runbook")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use mmbench_core::ResultsTable;

    use super::*;

    fn empty_results() -> ExperimentResults {
        ExperimentResults {
            size_sweep: ResultsTable::new(SweepKind::Size),
            granularity_sweep: ResultsTable::new(SweepKind::Granularity),
        }
    }

    #[test]
    fn id_depends_only_on_configuration() {
        let config = ExperimentConfig::default();
        let first = build_runbook(&config, &empty_results(), &[], "2026-01-01T00:00:00Z")
            .expect("runbook");
        let second = build_runbook(&config, &empty_results(), &[], "2026-02-01T00:00:00Z")
            .expect("runbook");
        assert_eq!(first.id, second.id);

        let other = ExperimentConfig {
            repetitions: 3,
            ..ExperimentConfig::default()
        };
        let third = build_runbook(&other, &empty_results(), &[], "2026-01-01T00:00:00Z")
            .expect("runbook");
        assert_ne!(first.id, third.id);
        assert_eq!(first.sweeps.len(), 2);
    }
}
