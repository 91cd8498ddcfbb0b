// Resolution domain model - bucket widths requested around the cursor
use serde::{Deserialize, Serialize};
use std::fmt;

/// Samples are recorded on a 5 minute cadence
pub const SAMPLES_PER_HOUR: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "3h")]
    ThreeHours,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "14d")]
    FourteenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
}

impl Resolution {
    pub const PLOT: [Resolution; 3] = [
        Resolution::ThirtyMinutes,
        Resolution::OneHour,
        Resolution::ThreeHours,
    ];

    pub const STATS: [Resolution; 5] = [
        Resolution::OneDay,
        Resolution::SevenDays,
        Resolution::FourteenDays,
        Resolution::ThirtyDays,
        Resolution::NinetyDays,
    ];

    /// Value of the `time_mod` query parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            Resolution::ThirtyMinutes => "30min",
            Resolution::OneHour => "1h",
            Resolution::ThreeHours => "3h",
            Resolution::SixHours => "6h",
            Resolution::OneDay => "1d",
            Resolution::ThreeDays => "3d",
            Resolution::SevenDays => "7d",
            Resolution::FourteenDays => "14d",
            Resolution::ThirtyDays => "30d",
            Resolution::NinetyDays => "90d",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::ThirtyMinutes => "30 min",
            Resolution::OneHour => "1 hour",
            Resolution::ThreeHours => "3 hours",
            Resolution::SixHours => "6 hours",
            Resolution::OneDay => "1 day",
            Resolution::ThreeDays => "3 days",
            Resolution::SevenDays => "7 days",
            Resolution::FourteenDays => "14 days",
            Resolution::ThirtyDays => "30 days",
            Resolution::NinetyDays => "90 days",
        }
    }

    pub fn hours(&self) -> f64 {
        match self {
            Resolution::ThirtyMinutes => 0.5,
            Resolution::OneHour => 1.0,
            Resolution::ThreeHours => 3.0,
            Resolution::SixHours => 6.0,
            Resolution::OneDay => 24.0,
            Resolution::ThreeDays => 24.0 * 3.0,
            Resolution::SevenDays => 24.0 * 7.0,
            Resolution::FourteenDays => 24.0 * 14.0,
            Resolution::ThirtyDays => 24.0 * 30.0,
            Resolution::NinetyDays => 24.0 * 90.0,
        }
    }

    /// Number of samples the source returns for a full window
    pub fn window_size(&self) -> usize {
        (self.hours() * SAMPLES_PER_HOUR) as usize
    }

    pub fn is_plot(&self) -> bool {
        Self::PLOT.contains(self)
    }

    pub fn is_stats(&self) -> bool {
        Self::STATS.contains(self)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}
