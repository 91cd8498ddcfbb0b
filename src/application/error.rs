// Replay error taxonomy
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("time-series fetch failed: {0:#}")]
    Fetch(#[source] anyhow::Error),

    #[error("checkpoint read failed: {0:#}")]
    CheckpointRead(#[source] anyhow::Error),

    #[error("checkpoint write failed: {0:#}")]
    CheckpointWrite(#[source] anyhow::Error),

    #[error("no samples available for subject {0}")]
    NoData(u32),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("replay session has ended")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, ReplayError>;
