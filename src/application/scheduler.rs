// Playback scheduler - state machine that advances the cursor one tick at a time
use crate::application::error::ReplayError;
use crate::domain::cursor::{AdvanceOutcome, Cursor, CursorMark};
use crate::domain::playback::PlaybackRate;
use crate::domain::resolution::Resolution;
use crate::domain::sample::Sample;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// No cursor yet
    Idle,
    /// Periodic timer active
    Advancing,
    /// Replayed the full recorded history
    Stalled,
}

/// One outstanding advance attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceRequest {
    pub seq: u64,
    pub dispatched: CursorMark,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced(NaiveDateTime),
    /// Not an error: the source has nothing after the cursor
    EndOfHistory,
    /// Fetch failed or returned unusable data; the timer keeps running
    Failed,
    /// The completion no longer matches the live cursor and was dropped
    Superseded,
}

/// The timer itself is owned by the session; this type decides whether a
/// tick may fetch and how its completion moves the cursor. At most one
/// advance is outstanding, so cursor writes arrive in dispatch order.
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    state: SchedulerState,
    rate: PlaybackRate,
    resolution: Resolution,
    in_flight: Option<u64>,
    next_seq: u64,
}

impl PlaybackScheduler {
    pub fn new(rate: PlaybackRate, resolution: Resolution) -> Self {
        Self {
            state: SchedulerState::Idle,
            rate,
            resolution,
            in_flight: None,
            next_seq: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn rate(&self) -> PlaybackRate {
        self.rate
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_advancing(&self) -> bool {
        self.state == SchedulerState::Advancing
    }

    /// Idle -> Advancing, once the cursor has been resolved
    pub fn start(&mut self) {
        self.state = SchedulerState::Advancing;
        self.in_flight = None;
    }

    /// Back to Idle while the cursor is re-resolved or the session ends
    pub fn reset(&mut self) {
        self.state = SchedulerState::Idle;
        self.in_flight = None;
    }

    /// Returns true when the caller must cancel and re-arm its timer
    pub fn set_rate(&mut self, rate: PlaybackRate) -> bool {
        let changed = self.rate != rate;
        self.rate = rate;
        changed && self.is_advancing()
    }

    /// Takes effect on the next tick; never changes state
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    pub fn begin_tick(&mut self, cursor: &Cursor) -> Option<AdvanceRequest> {
        if !self.is_advancing() {
            return None;
        }
        if let Some(seq) = self.in_flight {
            tracing::debug!(seq, "advance still outstanding, skipping tick");
            return None;
        }
        let dispatched = cursor.mark()?;

        self.next_seq += 1;
        self.in_flight = Some(self.next_seq);
        Some(AdvanceRequest {
            seq: self.next_seq,
            dispatched,
            resolution: self.resolution,
        })
    }

    pub fn complete_tick(
        &mut self,
        request: AdvanceRequest,
        result: anyhow::Result<Vec<Sample>>,
        cursor: &mut Cursor,
    ) -> TickOutcome {
        if self.in_flight != Some(request.seq) {
            return TickOutcome::Superseded;
        }
        self.in_flight = None;

        let samples = match result {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(seq = request.seq, "{}; tick skipped", ReplayError::Fetch(e));
                return TickOutcome::Failed;
            }
        };

        // Only the newest sample of the window drives the cursor
        let Some(last) = samples.last() else {
            self.state = SchedulerState::Stalled;
            return TickOutcome::EndOfHistory;
        };

        match cursor.advance(request.dispatched, last.timestamp) {
            AdvanceOutcome::Advanced(timestamp) => TickOutcome::Advanced(timestamp),
            AdvanceOutcome::Unchanged => {
                self.state = SchedulerState::Stalled;
                TickOutcome::EndOfHistory
            }
            AdvanceOutcome::Regressed(timestamp) => {
                tracing::warn!(
                    %timestamp,
                    cursor = %request.dispatched.value,
                    "source returned an older sample than the cursor; tick skipped"
                );
                TickOutcome::Failed
            }
            AdvanceOutcome::Superseded => TickOutcome::Superseded,
        }
    }
}
