use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use mmbench_core::errors::{BenchError, ErrorInfo};
use mmbench_core::{
    AggregatedMeasurement, ExperimentConfiguration, Measurement, ResultsTable, SweepKind, Variant,
};

/// Literal written in place of a mean when no trial succeeded.
pub const UNAVAILABLE: &str = "unavailable";

/// Fixed size recorded for rows of a granularity sweep read back from disk
/// when the caller does not know it.
const UNKNOWN_SIZE: u32 = 0;

/// Column names of an exported table.
pub fn table_columns(kind: SweepKind) -> Vec<String> {
    vec![
        kind.key_column().into(),
        "variant".into(),
        "mean_ms".into(),
        "successful_trials".into(),
        "repetitions".into(),
    ]
}

/// Writes one row per configuration, replacing any previous file.
pub fn write_results_csv(path: &Path, table: &ResultsTable) -> Result<(), BenchError> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|err| {
        BenchError::Report(
            ErrorInfo::new("export-open", "failed to create results table")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));
    writer
        .write_record(table_columns(table.kind))
        .map_err(|err| wrap_csv("export-write-header", err))?;
    for row in &table.rows {
        let mean = match row.measurement {
            Measurement::Available { mean_ms } => format!("{mean_ms:.6}"),
            Measurement::Unavailable => UNAVAILABLE.to_string(),
        };
        let record = vec![
            row.configuration.key(table.kind).to_string(),
            row.configuration.variant().label().to_string(),
            mean,
            row.successful_trials.to_string(),
            row.trials.to_string(),
        ];
        writer
            .write_record(&record)
            .map_err(|err| wrap_csv("export-write-row", err))?;
    }
    writer
        .flush()
        .map_err(|err| wrap_csv("export-flush", err.into()))?;
    Ok(())
}

/// Reads a table written by [`write_results_csv`].
///
/// The sweep kind is taken from the header. Size-sweep rows recover their
/// derived granularity; granularity-sweep rows get `fixed_size` (or 0 when
/// unknown) because the fixed size is not part of the table.
pub fn read_results_csv(path: &Path, fixed_size: Option<u32>) -> Result<ResultsTable, BenchError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|err| wrap_csv("export-read", err))?;
    let headers = reader
        .headers()
        .map_err(|err| wrap_csv("export-read-header", err))?
        .clone();
    let kind = match headers.get(0) {
        Some(column) if column == SweepKind::Size.key_column() => SweepKind::Size,
        Some(column) if column == SweepKind::Granularity.key_column() => SweepKind::Granularity,
        other => {
            return Err(BenchError::Report(
                ErrorInfo::new("export-schema", "unrecognised results table header")
                    .with_context("path", path.display().to_string())
                    .with_context("first_column", other.unwrap_or_default()),
            ))
        }
    };
    let mut table = ResultsTable::new(kind);
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|err| wrap_csv("export-record", err))?;
        let row = parse_row(kind, &record, fixed_size.unwrap_or(UNKNOWN_SIZE)).map_err(|info| {
            BenchError::Report(
                info.with_context("path", path.display().to_string())
                    .with_context("row", (line + 1).to_string()),
            )
        })?;
        table.push(row);
    }
    Ok(table)
}

fn parse_row(
    kind: SweepKind,
    record: &StringRecord,
    fixed_size: u32,
) -> Result<AggregatedMeasurement, ErrorInfo> {
    let field = |idx: usize, name: &str| {
        record
            .get(idx)
            .map(str::trim)
            .ok_or_else(|| {
                ErrorInfo::new("export-row", "missing column").with_context("column", name)
            })
    };
    let key: u64 = parse_number(field(0, kind.key_column())?, kind.key_column())?;
    let variant_label = field(1, "variant")?;
    let variant = Variant::from_label(variant_label).ok_or_else(|| {
        ErrorInfo::new("export-row", "unknown variant").with_context("variant", variant_label)
    })?;
    let mean = field(2, "mean_ms")?;
    let measurement = if mean == UNAVAILABLE {
        Measurement::Unavailable
    } else {
        Measurement::Available {
            mean_ms: parse_number(mean, "mean_ms")?,
        }
    };
    let successful_trials: u32 = parse_number(field(3, "successful_trials")?, "successful_trials")?;
    let trials: u32 = parse_number(field(4, "repetitions")?, "repetitions")?;
    let configuration = match kind {
        SweepKind::Size => {
            let size = u32::try_from(key).map_err(|_| {
                ErrorInfo::new("export-row", "size out of range")
                    .with_context("size", key.to_string())
            })?;
            ExperimentConfiguration::for_size(size, variant, trials)
        }
        SweepKind::Granularity => ExperimentConfiguration::new(fixed_size, variant, key, trials),
    };
    Ok(AggregatedMeasurement {
        configuration,
        measurement,
        trials,
        successful_trials,
    })
}

fn parse_number<T: std::str::FromStr>(raw: &str, column: &str) -> Result<T, ErrorInfo> {
    raw.parse().map_err(|_| {
        ErrorInfo::new("export-row", "invalid number")
            .with_context("column", column)
            .with_context("value", raw)
    })
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), BenchError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            BenchError::Report(
                ErrorInfo::new("report-create", "failed to create report directory")
                    .with_context("path", parent.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?
    }
    Ok(())
}

fn wrap_csv(code: &str, err: csv::Error) -> BenchError {
    BenchError::Report(ErrorInfo::new(code, "CSV results table failure").with_hint(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(size: u32, variant: Variant, measurement: Measurement) -> AggregatedMeasurement {
        AggregatedMeasurement {
            configuration: ExperimentConfiguration::for_size(size, variant, 10),
            measurement,
            trials: 10,
            successful_trials: if measurement.is_available() { 10 } else { 0 },
        }
    }

    #[test]
    fn unavailable_rows_are_marked_not_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report").join("resultados_e1.csv");
        let mut table = ResultsTable::new(SweepKind::Size);
        table.push(row(100, Variant::Sequential, Measurement::Available { mean_ms: 5.14 }));
        table.push(row(100, Variant::ThreadParallel, Measurement::Unavailable));
        write_results_csv(&path, &table).expect("write");

        let text = fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "size,variant,mean_ms,successful_trials,repetitions");
        assert_eq!(lines[1], "100,Sequential,5.140000,10,10");
        assert_eq!(lines[2], "100,Threads,unavailable,0,10");

        let restored = read_results_csv(&path, None).expect("read back");
        assert_eq!(restored, table);
    }

    #[test]
    fn granularity_table_uses_fixed_size_on_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("resultados_e2.csv");
        let mut table = ResultsTable::new(SweepKind::Granularity);
        table.push(AggregatedMeasurement {
            configuration: ExperimentConfiguration::new(800, Variant::ProcessParallel, 20000, 10),
            measurement: Measurement::Available { mean_ms: 120.4 },
            trials: 10,
            successful_trials: 10,
        });
        write_results_csv(&path, &table).expect("write");
        let restored = read_results_csv(&path, Some(800)).expect("read back");
        assert_eq!(restored, table);
    }

    #[test]
    fn unknown_header_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bogus.csv");
        fs::write(&path, "tamanho,algoritmo,tempo\n100,Sequencial,5.0\n").expect("write");
        let err = read_results_csv(&path, None).expect_err("schema");
        assert_eq!(err.info().code, "export-schema");
    }
}
