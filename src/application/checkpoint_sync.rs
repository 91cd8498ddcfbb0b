// Checkpoint synchronizer - recovers and mirrors the replay cursor
use crate::application::checkpoint_store::CheckpointStore;
use crate::application::error::{ReplayError, Result};
use crate::application::time_series_source::TimeSeriesSource;
use crate::domain::identity::SessionIdentity;
use crate::domain::resolution::Resolution;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct CheckpointSynchronizer {
    store: Arc<dyn CheckpointStore>,
    source: Arc<dyn TimeSeriesSource>,
}

impl CheckpointSynchronizer {
    pub fn new(store: Arc<dyn CheckpointStore>, source: Arc<dyn TimeSeriesSource>) -> Self {
        Self { store, source }
    }

    /// Resolve the starting cursor for a session.
    ///
    /// Prefers the persisted checkpoint. A missing checkpoint or a failed read
    /// falls back to the earliest sample of the subject's stream; only when that
    /// also fails is an error returned, and the caller leaves the cursor unset.
    pub async fn resolve_initial(
        &self,
        identity: &SessionIdentity,
        resolution: Resolution,
    ) -> Result<NaiveDateTime> {
        match self.store.get_last_viewed(&identity.username).await {
            Ok(Some(timestamp)) => {
                tracing::info!(username = %identity.username, %timestamp, "resuming from checkpoint");
                return Ok(timestamp);
            }
            Ok(None) => {
                tracing::debug!(username = %identity.username, "no checkpoint, starting from earliest sample");
            }
            Err(e) => {
                tracing::warn!(
                    username = %identity.username,
                    "{}; falling back to earliest sample",
                    ReplayError::CheckpointRead(e)
                );
            }
        }

        let samples = self
            .source
            .fetch_window(identity, resolution, None)
            .await
            .map_err(ReplayError::Fetch)?;

        samples
            .first()
            .map(|s| s.timestamp)
            .ok_or(ReplayError::NoData(identity.subject_id))
    }

    /// Start the background writer that mirrors cursor changes for `username`
    pub fn mirror(&self, username: String) -> CheckpointMirror {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(mirror_loop(self.store.clone(), username.clone(), rx));

        CheckpointMirror {
            store: self.store.clone(),
            username,
            tx,
            handle,
        }
    }
}

/// Best-effort durability for the next session.
///
/// Writes happen on a separate task in cursor order; when several changes land
/// while a write is outstanding only the newest one is written next.
pub struct CheckpointMirror {
    store: Arc<dyn CheckpointStore>,
    username: String,
    tx: watch::Sender<Option<NaiveDateTime>>,
    handle: JoinHandle<()>,
}

impl CheckpointMirror {
    pub fn persist(&self, timestamp: NaiveDateTime) {
        self.tx.send_replace(Some(timestamp));
    }

    /// Stop mirroring and attempt one last write of `timestamp`
    pub async fn flush_on_teardown(self, timestamp: Option<NaiveDateTime>) -> Result<()> {
        let CheckpointMirror {
            store,
            username,
            tx,
            handle,
        } = self;

        drop(tx);
        if let Err(e) = handle.await {
            tracing::warn!(%username, "checkpoint mirror task failed: {}", e);
        }

        let Some(timestamp) = timestamp else {
            tracing::debug!(%username, "no cursor to flush");
            return Ok(());
        };

        store
            .set_last_viewed(&username, timestamp)
            .await
            .map_err(ReplayError::CheckpointWrite)?;
        tracing::info!(%username, %timestamp, "final checkpoint written");
        Ok(())
    }
}

async fn mirror_loop(
    store: Arc<dyn CheckpointStore>,
    username: String,
    mut rx: watch::Receiver<Option<NaiveDateTime>>,
) {
    while rx.changed().await.is_ok() {
        let latest = *rx.borrow_and_update();
        let Some(timestamp) = latest else {
            continue;
        };

        match store.set_last_viewed(&username, timestamp).await {
            Ok(()) => tracing::debug!(%username, %timestamp, "checkpoint written"),
            Err(e) => tracing::warn!(%username, "{}", ReplayError::CheckpointWrite(e)),
        }
    }
}
