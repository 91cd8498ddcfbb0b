// Statistics domain models - named metrics and their display rows
use super::resolution::Resolution;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(deserialize_with = "deserialize_metric_value")]
    pub value: String,
    #[serde(default)]
    pub unit: Option<String>,
}

impl Metric {
    pub fn new(value: impl Into<String>, unit: Option<&str>) -> Self {
        Self {
            value: value.into(),
            unit: unit.map(str::to_string),
        }
    }
}

/// Backends send metric values either as text or as bare numbers
fn deserialize_metric_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawValue {
        Text(String),
        Number(f64),
    }

    Ok(match RawValue::deserialize(deserializer)? {
        RawValue::Text(text) => text,
        RawValue::Number(number) => number.to_string(),
    })
}

/// Metrics derived over one statistics window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatsSnapshot {
    pub current_glucose: Option<Metric>,
    pub average_glucose: Option<Metric>,
    pub glucose_std_dev: Option<Metric>,
    pub current_heart_rate: Option<Metric>,
    pub total_steps: Option<Metric>,
}

impl StatsSnapshot {
    /// Build from the legacy positional list of `"<label>: <value> <unit>"` strings.
    ///
    /// Positions: 0 current glucose, 1 average, 2 std dev, 3 current heart rate,
    /// 4 total steps. Missing or unparseable entries become `None`.
    pub fn from_positional(lines: &[String]) -> Self {
        let at = |idx: usize| lines.get(idx).and_then(|line| parse_metric(line));
        Self {
            current_glucose: at(0),
            average_glucose: at(1),
            glucose_std_dev: at(2),
            current_heart_rate: at(3),
            total_steps: at(4),
        }
    }
}

/// Parse `"Current: 120.0 mg/dL"` into value `120.0` and unit `mg/dL`
pub fn parse_metric(line: &str) -> Option<Metric> {
    let (_, rest) = line.split_once(':')?;
    let rest = rest.trim();
    if rest.is_empty() || rest.eq_ignore_ascii_case("n/a") {
        return None;
    }

    match rest.split_once(char::is_whitespace) {
        Some((value, unit)) => {
            let unit = unit.trim();
            Some(Metric::new(value, (!unit.is_empty()).then_some(unit)))
        }
        None => Some(Metric::new(rest, None)),
    }
}

/// One display slot; blank when the metric is missing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCell {
    pub label: &'static str,
    pub value: String,
    pub unit: String,
}

impl StatCell {
    fn from_metric(label: &'static str, metric: Option<&Metric>) -> Self {
        Self {
            label,
            value: metric.map(|m| m.value.clone()).unwrap_or_default(),
            unit: metric.and_then(|m| m.unit.clone()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsLayout {
    /// Current glucose and current heart rate
    Vitals,
    /// Average, standard deviation and total steps
    Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub cursor: Option<NaiveDateTime>,
    pub resolution: Resolution,
    pub layout: StatsLayout,
    pub cells: Vec<StatCell>,
}

impl StatsView {
    pub fn new(
        cursor: Option<NaiveDateTime>,
        resolution: Resolution,
        layout: StatsLayout,
        stats: &StatsSnapshot,
    ) -> Self {
        let cells = match layout {
            StatsLayout::Vitals => vec![
                StatCell::from_metric("Current Glucose", stats.current_glucose.as_ref()),
                StatCell::from_metric("Current Heart Rate", stats.current_heart_rate.as_ref()),
            ],
            StatsLayout::Summary => vec![
                StatCell::from_metric("Average", stats.average_glucose.as_ref()),
                StatCell::from_metric("Std Dev", stats.glucose_std_dev.as_ref()),
                StatCell::from_metric("Total steps", stats.total_steps.as_ref()),
            ],
        };

        Self {
            cursor,
            resolution,
            layout,
            cells,
        }
    }
}
