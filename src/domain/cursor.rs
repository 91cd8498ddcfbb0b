// Cursor domain model - the single "now" of a replay session
use chrono::NaiveDateTime;
use std::cmp::Ordering;

/// Cursor value captured when a request is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorMark {
    pub value: NaiveDateTime,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The cursor moved forward to this timestamp
    Advanced(NaiveDateTime),
    /// The candidate equals the cursor: nothing left to replay
    Unchanged,
    /// The candidate is older than the cursor and was ignored
    Regressed(NaiveDateTime),
    /// The cursor moved since the request was dispatched
    Superseded,
}

/// Authoritative replay position.
///
/// Only [`Cursor::resume`] may move the value backward; it also bumps the
/// generation so completions dispatched before the resume are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    value: Option<NaiveDateTime>,
    generation: u64,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<NaiveDateTime> {
        self.value
    }

    pub fn mark(&self) -> Option<CursorMark> {
        self.value.map(|value| CursorMark {
            value,
            generation: self.generation,
        })
    }

    pub fn resume(&mut self, ts: NaiveDateTime) {
        self.value = Some(ts);
        self.generation += 1;
    }

    pub fn advance(&mut self, dispatched: CursorMark, candidate: NaiveDateTime) -> AdvanceOutcome {
        if self.mark() != Some(dispatched) {
            return AdvanceOutcome::Superseded;
        }

        match candidate.cmp(&dispatched.value) {
            Ordering::Greater => {
                self.value = Some(candidate);
                AdvanceOutcome::Advanced(candidate)
            }
            Ordering::Equal => AdvanceOutcome::Unchanged,
            Ordering::Less => AdvanceOutcome::Regressed(candidate),
        }
    }

    /// Drop the value at session end, returning the last position
    pub fn take(&mut self) -> Option<NaiveDateTime> {
        self.generation += 1;
        self.value.take()
    }
}
