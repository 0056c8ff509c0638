use std::fs;

use mmbench_core::{
    AggregatedMeasurement, ExperimentConfiguration, Measurement, ResultsTable, SweepKind, Variant,
};
use tempfile::tempdir;

use mmbench_exp::{read_results_csv, ExperimentConfig, ExperimentResults, ReportEmitter, ReportSink};

fn row(configuration: ExperimentConfiguration, mean: Option<f64>) -> AggregatedMeasurement {
    AggregatedMeasurement {
        configuration,
        measurement: mean.map_or(Measurement::Unavailable, |mean_ms| Measurement::Available {
            mean_ms,
        }),
        trials: 10,
        successful_trials: if mean.is_some() { 10 } else { 0 },
    }
}

fn sample_results() -> ExperimentResults {
    let mut size_sweep = ResultsTable::new(SweepKind::Size);
    for (size, seq, threads, process) in [
        (100, Some(5.14), Some(3.2), Some(4.1)),
        (200, Some(41.0), None, Some(22.5)),
    ] {
        for (variant, mean) in [
            (Variant::Sequential, seq),
            (Variant::ThreadParallel, threads),
            (Variant::ProcessParallel, process),
        ] {
            size_sweep.push(row(ExperimentConfiguration::for_size(size, variant, 10), mean));
        }
    }
    let mut granularity_sweep = ResultsTable::new(SweepKind::Granularity);
    for (p, threads, process) in
        [(20_000, Some(130.0), Some(120.4)), (40_000, Some(110.0), Some(118.0))]
    {
        for (variant, mean) in
            [(Variant::ThreadParallel, threads), (Variant::ProcessParallel, process)]
        {
            granularity_sweep.push(row(ExperimentConfiguration::new(800, variant, p, 10), mean));
        }
    }
    ExperimentResults {
        size_sweep,
        granularity_sweep,
    }
}

#[test]
fn emitter_writes_tables_charts_and_runbook() {
    let dir = tempdir().unwrap();
    let config = ExperimentConfig {
        project_root: dir.path().to_path_buf(),
        ..ExperimentConfig::default()
    };
    let results = sample_results();
    let mut emitter = ReportEmitter::new(&config);
    emitter.emit(&results).unwrap();

    let report = dir.path().join("report");
    for name in [
        "resultados_e1.csv",
        "resultados_e2.csv",
        "grafico_e1.svg",
        "grafico_e2.svg",
        "runbook.json",
    ] {
        assert!(report.join(name).is_file(), "missing {name}");
    }
    assert_eq!(emitter.written().len(), 5);

    let e1 = fs::read_to_string(report.join("resultados_e1.csv")).unwrap();
    assert!(e1.contains("200,Threads,unavailable,0,10"));
    let e2 = fs::read_to_string(report.join("resultados_e2.csv")).unwrap();
    assert!(e2.starts_with("granularity,variant,mean_ms,successful_trials,repetitions"));
    assert!(e2.contains("20000,Process,120.400000,10,10"));

    let svg = fs::read_to_string(report.join("grafico_e1.svg")).unwrap();
    assert!(svg.contains("Threads @ size=200"));

    let runbook: serde_json::Value =
        serde_json::from_slice(&fs::read(report.join("runbook.json")).unwrap()).unwrap();
    assert_eq!(runbook["sweeps"][0]["unavailable"], 1);
    assert_eq!(runbook["sweeps"][1]["rows"], 4);
    assert_eq!(runbook["artifacts"].as_array().unwrap().len(), 4);
    assert_eq!(runbook["id"].as_str().unwrap().len(), 64);

    let restored = read_results_csv(&report.join("resultados_e2.csv"), Some(800)).unwrap();
    assert_eq!(restored, results.granularity_sweep);
}

#[test]
fn charts_can_be_rebuilt_from_exported_tables() {
    let dir = tempdir().unwrap();
    let config = ExperimentConfig {
        project_root: dir.path().to_path_buf(),
        ..ExperimentConfig::default()
    };
    ReportEmitter::new(&config).emit(&sample_results()).unwrap();
    let chart = dir.path().join("report").join("grafico_e2.svg");
    let before = fs::read_to_string(&chart).unwrap();
    fs::remove_file(&chart).unwrap();

    let mut emitter = ReportEmitter::new(&config);
    let charts = emitter.render_charts_from_csv().unwrap();

    assert_eq!(charts.len(), 2);
    assert_eq!(fs::read_to_string(&chart).unwrap(), before);
}

#[test]
fn rebuilding_without_tables_fails() {
    let dir = tempdir().unwrap();
    let config = ExperimentConfig {
        project_root: dir.path().to_path_buf(),
        ..ExperimentConfig::default()
    };
    let err = ReportEmitter::new(&config).render_charts_from_csv().unwrap_err();
    assert_eq!(err.info().code, "export-read");
}
