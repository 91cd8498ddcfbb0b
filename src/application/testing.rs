// In-memory fakes of the source and checkpoint ports for unit tests
use crate::application::checkpoint_store::CheckpointStore;
use crate::application::time_series_source::TimeSeriesSource;
use crate::domain::identity::SessionIdentity;
use crate::domain::resolution::Resolution;
use crate::domain::sample::Sample;
use crate::domain::stats::{Metric, StatsSnapshot};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// `2025-06-01 00:00` plus `step` five-minute samples
pub fn ts(step: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + ChronoDuration::minutes(5 * step)
}

pub fn stream(len: i64) -> Vec<Sample> {
    (0..len)
        .map(|i| Sample::new(ts(i), 100.0 + i as f64, Some(70.0)))
        .collect()
}

pub fn identity(username: &str) -> SessionIdentity {
    SessionIdentity::new(username, 7, true)
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowCall {
    pub resolution: Resolution,
    pub after: Option<NaiveDateTime>,
}

/// Serves windows the way the remote source slices its recorded history
#[derive(Default)]
pub struct FakeSource {
    samples: Vec<Sample>,
    stats_lines: Option<Vec<String>>,
    after_delay: Mutex<Option<Duration>>,
    failures: Mutex<usize>,
    calls: Mutex<Vec<WindowCall>>,
}

impl FakeSource {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            ..Default::default()
        }
    }

    pub fn with_stats_lines(mut self, lines: &[&str]) -> Self {
        self.stats_lines = Some(lines.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Delay every window read that carries an `after` filter
    pub fn delay_after_reads(&self, delay: Duration) {
        *self.after_delay.lock().unwrap() = Some(delay);
    }

    /// Fail the next `n` window reads that carry an `after` filter
    pub fn fail_next_after_reads(&self, n: usize) {
        *self.failures.lock().unwrap() = n;
    }

    pub fn calls(&self) -> Vec<WindowCall> {
        self.calls.lock().unwrap().clone()
    }

    fn slice(&self, resolution: Resolution, after: Option<NaiveDateTime>) -> Vec<Sample> {
        if self.samples.is_empty() {
            return Vec::new();
        }
        let end = match after {
            None => 1,
            Some(after) => self
                .samples
                .iter()
                .position(|s| s.timestamp > after)
                .map(|idx| idx + 1)
                .unwrap_or(self.samples.len()),
        };
        let start = end.saturating_sub(resolution.window_size());
        self.samples[start..end].to_vec()
    }
}

#[async_trait]
impl TimeSeriesSource for FakeSource {
    async fn fetch_window(
        &self,
        _identity: &SessionIdentity,
        resolution: Resolution,
        after: Option<NaiveDateTime>,
    ) -> anyhow::Result<Vec<Sample>> {
        self.calls.lock().unwrap().push(WindowCall { resolution, after });

        if after.is_some() {
            let delay = *self.after_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                anyhow::bail!("connection reset by peer");
            }
        }

        Ok(self.slice(resolution, after))
    }

    async fn fetch_stats(
        &self,
        _identity: &SessionIdentity,
        resolution: Resolution,
        after: Option<NaiveDateTime>,
    ) -> anyhow::Result<StatsSnapshot> {
        if let Some(lines) = &self.stats_lines {
            return Ok(StatsSnapshot::from_positional(lines));
        }

        let window = self.slice(resolution, after);
        let last = window.last();
        Ok(StatsSnapshot {
            current_glucose: last.map(|s| Metric::new(format!("{:.1}", s.glucose), Some("mg/dL"))),
            current_heart_rate: last
                .and_then(|s| s.heart_rate)
                .map(|hr| Metric::new(format!("{:.1}", hr), Some("bpm"))),
            ..Default::default()
        })
    }
}

#[derive(Default)]
pub struct FakeCheckpointStore {
    stored: Mutex<HashMap<String, NaiveDateTime>>,
    writes: Mutex<Vec<(String, NaiveDateTime)>>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl FakeCheckpointStore {
    pub fn with_checkpoint(username: &str, timestamp: NaiveDateTime) -> Self {
        let store = Self::default();
        store
            .stored
            .lock()
            .unwrap()
            .insert(username.to_string(), timestamp);
        store
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    pub fn writes(&self) -> Vec<(String, NaiveDateTime)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn stored(&self, username: &str) -> Option<NaiveDateTime> {
        self.stored.lock().unwrap().get(username).copied()
    }
}

#[async_trait]
impl CheckpointStore for FakeCheckpointStore {
    async fn get_last_viewed(&self, username: &str) -> anyhow::Result<Option<NaiveDateTime>> {
        if *self.fail_reads.lock().unwrap() {
            anyhow::bail!("checkpoint service unavailable");
        }
        Ok(self.stored(username))
    }

    async fn set_last_viewed(&self, username: &str, timestamp: NaiveDateTime) -> anyhow::Result<()> {
        if *self.fail_writes.lock().unwrap() {
            anyhow::bail!("checkpoint service unavailable");
        }
        self.writes
            .lock()
            .unwrap()
            .push((username.to_string(), timestamp));
        self.stored
            .lock()
            .unwrap()
            .insert(username.to_string(), timestamp);
        Ok(())
    }
}
