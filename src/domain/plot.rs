// Plot domain models - glucose window with fixed physiological reference bands
use super::resolution::Resolution;
use super::sample::Sample;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Upper bound on x-axis labels, independent of the window size
pub const MAX_AXIS_TICKS: usize = 12;
pub const TICK_FORMAT: &str = "%H:%M";

pub const Y_MIN: f64 = 0.0;
pub const Y_MAX: f64 = 400.0;
pub const Y_STEP: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceBand {
    pub name: &'static str,
    pub low: f64,
    pub high: f64,
    pub color: &'static str,
}

pub const TARGET_RANGE: ReferenceBand = ReferenceBand {
    name: "target",
    low: 70.0,
    high: 180.0,
    color: "rgba(0,200,0,0.15)",
};

pub const HYPERGLYCEMIA: ReferenceBand = ReferenceBand {
    name: "hyperglycemia",
    low: 300.0,
    high: 400.0,
    color: "rgba(200,0,0,0.15)",
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlucosePoint {
    pub timestamp: NaiveDateTime,
    pub glucose: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub timestamp: NaiveDateTime,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotView {
    pub cursor: Option<NaiveDateTime>,
    pub resolution: Resolution,
    pub points: Vec<GlucosePoint>,
    pub ticks: Vec<AxisTick>,
    pub bands: [ReferenceBand; 2],
    pub y_min: f64,
    pub y_max: f64,
    pub y_step: f64,
}

impl PlotView {
    /// Keeps at most one resolution window of samples, ending at the newest
    pub fn new(cursor: Option<NaiveDateTime>, resolution: Resolution, samples: &[Sample]) -> Self {
        let start = samples.len().saturating_sub(resolution.window_size());
        let points: Vec<GlucosePoint> = samples[start..]
            .iter()
            .map(|s| GlucosePoint {
                timestamp: s.timestamp,
                glucose: s.glucose,
            })
            .collect();
        let ticks = axis_ticks(&points);

        Self {
            cursor,
            resolution,
            points,
            ticks,
            bands: [TARGET_RANGE, HYPERGLYCEMIA],
            y_min: Y_MIN,
            y_max: Y_MAX,
            y_step: Y_STEP,
        }
    }
}

/// Spread at most `MAX_AXIS_TICKS` labels evenly over the points, keeping both ends
fn axis_ticks(points: &[GlucosePoint]) -> Vec<AxisTick> {
    let count = points.len().min(MAX_AXIS_TICKS);
    let tick = |p: &GlucosePoint| AxisTick {
        timestamp: p.timestamp,
        label: p.timestamp.format(TICK_FORMAT).to_string(),
    };

    match count {
        0 => Vec::new(),
        1 => vec![tick(&points[0])],
        _ => (0..count)
            .map(|i| tick(&points[i * (points.len() - 1) / (count - 1)]))
            .collect(),
    }
}
