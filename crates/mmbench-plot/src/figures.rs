use std::fmt::Write as _;

use mmbench_core::{Measurement, ResultsTable, Variant};
use serde::{Deserialize, Serialize};

use crate::scale::{format_tick, Axis, AxisScale};

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 150.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub y_scale: AxisScale,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            title: String::new(),
            x_label: String::new(),
            y_label: "Mean execution time (ms)".to_string(),
            y_scale: AxisScale::Linear,
        }
    }
}

fn variant_color(variant: Variant) -> &'static str {
    match variant {
        Variant::Sequential => "#1f77b4",
        Variant::ThreadParallel => "#ff7f0e",
        Variant::ProcessParallel => "#2ca02c",
    }
}

struct Frame {
    x: Axis,
    y: Axis,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn px(&self, value: f64) -> f64 {
        self.left + self.x.fraction(value) * self.width
    }

    fn py(&self, value: f64) -> f64 {
        self.top + (1.0 - self.y.fraction(value)) * self.height
    }
}

/// Renders one line per variant of `table` as a standalone SVG document.
///
/// Rows whose measurement is unavailable (or cannot be placed on a log axis)
/// are never drawn; they are listed in a footnote under the plot instead.
pub fn render_results_svg(table: &ResultsTable, config: &ChartConfig) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns='http://www.w3.org/2000/svg' width='{w}' height='{h}' font-family='sans-serif' font-size='12'>",
        w = config.width,
        h = config.height
    );
    let _ = write!(
        svg,
        "<rect x='0' y='0' width='{}' height='{}' fill='#ffffff' />",
        config.width, config.height
    );
    let _ = write!(
        svg,
        "<text x='{:.2}' y='28' text-anchor='middle' font-size='16'>{}</text>",
        f64::from(config.width) / 2.0,
        escape(&config.title)
    );

    let keys: Vec<f64> = table
        .rows
        .iter()
        .map(|row| row.configuration.key(table.kind) as f64)
        .collect();
    let means: Vec<f64> = table
        .rows
        .iter()
        .filter_map(|row| row.measurement.mean_ms())
        .collect();
    let omitted = omitted_points(table, config.y_scale);

    let frame = match (
        Axis::fit(AxisScale::Linear, &keys, false),
        Axis::fit(config.y_scale, &means, true),
    ) {
        (Some(x), Some(y)) => Frame {
            x,
            y,
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: (f64::from(config.width) - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
            height: (f64::from(config.height) - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
        },
        _ => {
            let _ = write!(
                svg,
                "<text x='{:.2}' y='{:.2}' text-anchor='middle' fill='#666666'>no measurements available</text>",
                f64::from(config.width) / 2.0,
                f64::from(config.height) / 2.0
            );
            push_footnote(&mut svg, config, &omitted);
            svg.push_str("</svg>");
            return svg;
        }
    };

    push_axes(&mut svg, &frame, config, table);
    for (idx, variant) in table.variants().into_iter().enumerate() {
        push_series(&mut svg, &frame, table, variant, config.y_scale);
        push_legend_entry(&mut svg, &frame, variant, idx);
    }
    push_footnote(&mut svg, config, &omitted);
    svg.push_str("</svg>");
    svg
}

fn push_axes(svg: &mut String, frame: &Frame, config: &ChartConfig, table: &ResultsTable) {
    let bottom = frame.top + frame.height;
    let right = frame.left + frame.width;
    for tick in frame.y.ticks() {
        let y = frame.py(tick);
        let _ = write!(
            svg,
            "<line x1='{:.2}' y1='{y:.2}' x2='{right:.2}' y2='{y:.2}' stroke='#dddddd' stroke-dasharray='4 4' />",
            frame.left
        );
        let _ = write!(
            svg,
            "<text x='{:.2}' y='{:.2}' text-anchor='end'>{}</text>",
            frame.left - 6.0,
            y + 4.0,
            format_tick(tick)
        );
    }
    let mut keys: Vec<u64> = table
        .rows
        .iter()
        .map(|row| row.configuration.key(table.kind))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    for key in keys {
        let x = frame.px(key as f64);
        let _ = write!(
            svg,
            "<line x1='{x:.2}' y1='{:.2}' x2='{x:.2}' y2='{bottom:.2}' stroke='#eeeeee' />",
            frame.top
        );
        let _ = write!(
            svg,
            "<text x='{x:.2}' y='{:.2}' text-anchor='middle'>{key}</text>",
            bottom + 18.0
        );
    }
    let _ = write!(
        svg,
        "<polyline points='{l:.2},{t:.2} {l:.2},{b:.2} {r:.2},{b:.2}' fill='none' stroke='#333333' />",
        l = frame.left,
        t = frame.top,
        b = bottom,
        r = right
    );
    let _ = write!(
        svg,
        "<text x='{:.2}' y='{:.2}' text-anchor='middle'>{}</text>",
        frame.left + frame.width / 2.0,
        bottom + 40.0,
        escape(&config.x_label)
    );
    let mid_y = frame.top + frame.height / 2.0;
    let _ = write!(
        svg,
        "<text x='20' y='{mid_y:.2}' text-anchor='middle' transform='rotate(-90 20 {mid_y:.2})'>{}</text>",
        escape(&config.y_label)
    );
}

fn push_series(
    svg: &mut String,
    frame: &Frame,
    table: &ResultsTable,
    variant: Variant,
    y_scale: AxisScale,
) {
    let color = variant_color(variant);
    let points: Vec<(f64, f64)> = table
        .series(variant)
        .into_iter()
        .filter_map(|(key, measurement)| measurement.mean_ms().map(|mean| (key as f64, mean)))
        .filter(|(_, mean)| plottable(*mean, y_scale))
        .map(|(key, mean)| (frame.px(key), frame.py(mean)))
        .collect();
    if points.len() > 1 {
        let path: Vec<String> = points
            .iter()
            .map(|(x, y)| format!("{x:.2},{y:.2}"))
            .collect();
        let _ = write!(
            svg,
            "<polyline points='{}' fill='none' stroke='{color}' stroke-width='2' />",
            path.join(" ")
        );
    }
    for (x, y) in points {
        let _ = write!(
            svg,
            "<circle cx='{x:.2}' cy='{y:.2}' r='4' fill='{color}' />"
        );
    }
}

fn push_legend_entry(svg: &mut String, frame: &Frame, variant: Variant, idx: usize) {
    let x = frame.left + frame.width + 20.0;
    let y = frame.top + 10.0 + 22.0 * idx as f64;
    let _ = write!(
        svg,
        "<line x1='{x:.2}' y1='{y:.2}' x2='{:.2}' y2='{y:.2}' stroke='{}' stroke-width='2' />",
        x + 24.0,
        variant_color(variant)
    );
    let _ = write!(
        svg,
        "<text x='{:.2}' y='{:.2}'>{}</text>",
        x + 30.0,
        y + 4.0,
        variant.label()
    );
}

fn push_footnote(svg: &mut String, config: &ChartConfig, omitted: &[String]) {
    if omitted.is_empty() {
        return;
    }
    let _ = write!(
        svg,
        "<text x='{:.2}' y='{:.2}' fill='#b91c1c'>not plotted (unavailable): {}</text>",
        MARGIN_LEFT,
        f64::from(config.height) - 12.0,
        escape(&omitted.join(", "))
    );
}

fn plottable(mean: f64, y_scale: AxisScale) -> bool {
    mean.is_finite() && (y_scale == AxisScale::Linear || mean > 0.0)
}

fn omitted_points(table: &ResultsTable, y_scale: AxisScale) -> Vec<String> {
    table
        .rows
        .iter()
        .filter(|row| match row.measurement {
            Measurement::Available { mean_ms } => !plottable(mean_ms, y_scale),
            Measurement::Unavailable => true,
        })
        .map(|row| {
            format!(
                "{} @ {}={}",
                row.configuration.variant().label(),
                table.kind.key_column(),
                row.configuration.key(table.kind)
            )
        })
        .collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
}
