// Playback rate domain model
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackRate {
    #[default]
    Slow,
    Normal,
    Fast,
}

impl PlaybackRate {
    pub fn interval_ms(&self) -> u64 {
        match self {
            PlaybackRate::Slow => 2000,
            PlaybackRate::Normal => 1000,
            PlaybackRate::Fast => 500,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }

    /// Toggle text shown on the speed button
    pub fn symbol(&self) -> &'static str {
        match self {
            PlaybackRate::Slow => ">",
            PlaybackRate::Normal => ">>",
            PlaybackRate::Fast => ">>>",
        }
    }

    /// Next rate in the cycle, wrapping back to the slowest
    pub fn next(&self) -> Self {
        match self {
            PlaybackRate::Slow => PlaybackRate::Normal,
            PlaybackRate::Normal => PlaybackRate::Fast,
            PlaybackRate::Fast => PlaybackRate::Slow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps() {
        let mut rate = PlaybackRate::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(rate.interval_ms());
            rate = rate.next();
        }
        assert_eq!(seen, vec![2000, 1000, 500, 2000]);
    }
}
