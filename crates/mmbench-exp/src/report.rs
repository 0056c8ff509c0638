use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use mmbench_core::errors::{BenchError, ErrorInfo};
use mmbench_core::{ResultsTable, SweepKind};
use mmbench_plot::{render_results_svg, AxisScale, ChartConfig};
use tracing::info;

use crate::config::ExperimentConfig;
use crate::driver::{ExperimentResults, ReportSink};
use crate::export::{ensure_parent, read_results_csv, write_results_csv};
use crate::runbook::{build_runbook, write_runbook};

/// File name of the exported table of a sweep.
pub fn table_file_name(kind: SweepKind) -> String {
    format!("resultados_{}.csv", kind.id().to_lowercase())
}

/// File name of the chart of a sweep.
pub fn chart_file_name(kind: SweepKind) -> String {
    format!("grafico_{}.svg", kind.id().to_lowercase())
}

/// Chart layout for a sweep: E1 on a log scale, E2 linear at the fixed size.
pub fn chart_config(kind: SweepKind, fixed_size: u32) -> ChartConfig {
    match kind {
        SweepKind::Size => ChartConfig {
            title: "E1: execution time vs matrix size".to_string(),
            x_label: "Matrix size (N x N)".to_string(),
            y_label: "Mean execution time (ms, log scale)".to_string(),
            y_scale: AxisScale::Log,
            ..ChartConfig::default()
        },
        SweepKind::Granularity => ChartConfig {
            title: format!("E2: execution time vs P ({fixed_size}x{fixed_size} matrices)"),
            x_label: "P (elements per task)".to_string(),
            y_label: "Mean execution time (ms)".to_string(),
            y_scale: AxisScale::Linear,
            ..ChartConfig::default()
        },
    }
}

/// Writes the tables, charts and runbook of a run into the report directory.
#[derive(Debug, Clone)]
pub struct ReportEmitter {
    config: ExperimentConfig,
    report_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl ReportEmitter {
    pub fn new(config: &ExperimentConfig) -> Self {
        Self {
            report_dir: config.resolve(&config.paths.report_dir),
            config: config.clone(),
            written: Vec::new(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Every file written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Exports one sweep's table as CSV.
    pub fn write_table(&mut self, table: &ResultsTable) -> Result<PathBuf, BenchError> {
        let path = self.report_dir.join(table_file_name(table.kind));
        write_results_csv(&path, table)?;
        info!(sweep = %table.kind, path = %path.display(), "results table written");
        self.written.push(path.clone());
        Ok(path)
    }

    /// Renders one sweep's comparison chart as SVG.
    pub fn write_chart(&mut self, table: &ResultsTable) -> Result<PathBuf, BenchError> {
        let path = self.report_dir.join(chart_file_name(table.kind));
        let chart = chart_config(table.kind, self.config.granularity_sweep.size);
        let svg = render_results_svg(table, &chart);
        ensure_parent(&path)?;
        fs::write(&path, svg).map_err(|err| {
            BenchError::Report(
                ErrorInfo::new("chart-write", "failed to write chart")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        info!(sweep = %table.kind, path = %path.display(), "chart written");
        self.written.push(path.clone());
        Ok(path)
    }

    /// Writes the runbook listing every artifact written before it.
    pub fn write_runbook(&mut self, results: &ExperimentResults) -> Result<PathBuf, BenchError> {
        let path = self.report_dir.join("runbook.json");
        let runbook = build_runbook(&self.config, results, &self.written, Utc::now().to_rfc3339())?;
        write_runbook(&path, &runbook)?;
        self.written.push(path.clone());
        Ok(path)
    }

    /// Re-renders both charts from previously exported tables.
    pub fn render_charts_from_csv(&mut self) -> Result<Vec<PathBuf>, BenchError> {
        let mut charts = Vec::new();
        for kind in [SweepKind::Size, SweepKind::Granularity] {
            let source = self.report_dir.join(table_file_name(kind));
            let fixed_size = match kind {
                SweepKind::Size => None,
                SweepKind::Granularity => Some(self.config.granularity_sweep.size),
            };
            let table = read_results_csv(&source, fixed_size)?;
            if table.kind != kind {
                return Err(BenchError::Report(
                    ErrorInfo::new("report-table-kind", "results table holds another sweep")
                        .with_context("path", source.display().to_string())
                        .with_context("expected", kind.id()),
                ));
            }
            charts.push(self.write_chart(&table)?);
        }
        Ok(charts)
    }
}

impl ReportSink for ReportEmitter {
    fn emit(&mut self, results: &ExperimentResults) -> Result<(), BenchError> {
        for kind in [SweepKind::Size, SweepKind::Granularity] {
            self.write_table(results.table(kind))?;
        }
        for kind in [SweepKind::Size, SweepKind::Granularity] {
            self.write_chart(results.table(kind))?;
        }
        self.write_runbook(results)?;
        Ok(())
    }
}
