use serde::{Deserialize, Serialize};

/// Upper bound on the number of ticks drawn on a linear axis.
const MAX_TICKS: usize = 50;

/// Mapping from data values to chart positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    Linear,
    Log,
}

/// A fitted axis range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    scale: AxisScale,
    min: f64,
    max: f64,
}

impl Axis {
    /// Fits an axis around `values`, or `None` when nothing is plottable.
    ///
    /// Log axes ignore non-positive values and snap to whole decades. Linear
    /// axes optionally include zero and get a 5% headroom. Bounds are clamped
    /// to finite values so extreme inputs still produce a drawable axis.
    pub fn fit(scale: AxisScale, values: &[f64], include_zero: bool) -> Option<Self> {
        let usable: Vec<f64> = values
            .iter()
            .copied()
            .filter(|value| value.is_finite() && (scale == AxisScale::Linear || *value > 0.0))
            .collect();
        let lo = usable.iter().copied().reduce(f64::min)?;
        let hi = usable.iter().copied().reduce(f64::max)?;
        let (min, max) = match scale {
            AxisScale::Log => {
                let min = 10f64.powi(lo.log10().floor() as i32);
                let mut max = 10f64.powi(hi.log10().ceil() as i32);
                if max <= min {
                    max = min * 10.0;
                }
                (min, max.min(f64::MAX))
            }
            AxisScale::Linear => {
                let min = if include_zero { lo.min(0.0) } else { lo };
                let mut max = hi;
                if max <= min {
                    max = min + min.abs().max(1.0);
                }
                let headroom = if include_zero { (max - min) * 0.05 } else { 0.0 };
                (min, (max + headroom).min(f64::MAX))
            }
        };
        (min.is_finite() && max > min).then_some(Self { scale, min, max })
    }

    pub fn scale(&self) -> AxisScale {
        self.scale
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns `true` when `value` can be placed on this axis.
    pub fn accepts(&self, value: f64) -> bool {
        value.is_finite() && (self.scale == AxisScale::Linear || value > 0.0)
    }

    /// Position of `value` as a fraction of the axis length.
    pub fn fraction(&self, value: f64) -> f64 {
        match self.scale {
            AxisScale::Linear => (value - self.min) / (self.max - self.min),
            AxisScale::Log => {
                (value.log10() - self.min.log10()) / (self.max.log10() - self.min.log10())
            }
        }
    }

    /// Tick positions: whole decades on log axes, round steps on linear axes.
    pub fn ticks(&self) -> Vec<f64> {
        match self.scale {
            AxisScale::Log => {
                let first = self.min.log10().round() as i32;
                let last = self.max.log10().round() as i32;
                (first..=last).map(|exp| 10f64.powi(exp)).collect()
            }
            AxisScale::Linear => {
                let step = nice_step(self.max / 4.0 - self.min / 4.0);
                let first = (self.min / step).ceil();
                let last = (self.max / step + 1e-9).floor();
                if !(first.is_finite() && last.is_finite()) || last < first {
                    return Vec::new();
                }
                let count = ((last - first) as usize).min(MAX_TICKS - 1);
                (0..=count).map(|idx| (first + idx as f64) * step).collect()
            }
        }
    }
}

fn nice_step(raw: f64) -> f64 {
    if raw <= 0.0 || !raw.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Compact tick label: integers without decimals, small values with up to three.
pub(crate) fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{value:.3}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
