use std::error::Error;

use mmbench_exp::{ExperimentConfig, ReportEmitter};
use tracing::info;

/// Re-renders both charts from the tables of an earlier run.
pub fn run(config: &ExperimentConfig) -> Result<(), Box<dyn Error>> {
    let mut emitter = ReportEmitter::new(config);
    let charts = emitter.render_charts_from_csv()?;
    info!(charts = charts.len(), dir = %emitter.report_dir().display(), "charts regenerated");
    Ok(())
}
