//! Deterministic SVG rendering of sweep results.

pub mod figures;
mod scale;

pub use figures::{render_results_svg, ChartConfig};
pub use scale::{Axis, AxisScale};
