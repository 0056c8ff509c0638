use std::error::Error;

use mmbench_exp::{
    ensure_built, ArtifactHarvester, ExperimentConfig, ExperimentDriver, Invoker, ProgramLayout,
    ReportEmitter, SweepRegistry,
};
use tracing::info;

/// Builds the programs, runs both sweeps and writes the report.
pub fn run(config: &ExperimentConfig, skip_build: bool) -> Result<(), Box<dyn Error>> {
    if skip_build {
        info!("build step skipped on request");
    } else {
        ensure_built(&config.build, &config.project_root)?;
    }

    let registry = SweepRegistry::from_config(config);
    info!(
        e1 = registry.size_sweep().len(),
        e2 = registry.granularity_sweep().len(),
        trials = registry.total_trials(),
        repetitions = config.repetitions,
        "experiment plan"
    );
    let invoker = Invoker::new()
        .with_working_dir(&config.project_root)
        .with_timeout(config.trial_timeout());
    let harvester = ArtifactHarvester::new(
        config.resolve(&config.paths.results_dir),
        config.artifacts.clone(),
    );
    let mut driver = ExperimentDriver::new(
        ProgramLayout::from_config(config),
        registry,
        invoker,
        harvester,
    );
    let mut emitter = ReportEmitter::new(config);
    let results = driver.run(&mut emitter)?;

    info!(
        e1_unavailable = results.size_sweep.unavailable_count(),
        e2_unavailable = results.granularity_sweep.unavailable_count(),
        report = %emitter.report_dir().display(),
        "experiment finished"
    );
    Ok(())
}
