// Replay session - single owner of the cursor, the timer and every view
use crate::application::checkpoint_store::CheckpointStore;
use crate::application::checkpoint_sync::{CheckpointMirror, CheckpointSynchronizer};
use crate::application::error::{ReplayError, Result};
use crate::application::scheduler::{AdvanceRequest, PlaybackScheduler, SchedulerState, TickOutcome};
use crate::application::time_series_source::TimeSeriesSource;
use crate::application::window_reader::{self, ReaderKind, ReaderRequest, ReaderView, WindowReader};
use crate::domain::cursor::Cursor;
use crate::domain::identity::SessionIdentity;
use crate::domain::playback::PlaybackRate;
use crate::domain::plot::PlotView;
use crate::domain::resolution::Resolution;
use crate::domain::sample::Sample;
use crate::domain::stats::StatsView;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub rate: PlaybackRate,
    pub plot_resolution: Resolution,
    pub short_stats_resolution: Resolution,
    pub long_stats_resolution: Resolution,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            rate: PlaybackRate::Slow,
            plot_resolution: Resolution::OneHour,
            short_stats_resolution: Resolution::OneDay,
            long_stats_resolution: Resolution::OneDay,
        }
    }
}

/// Everything a consumer needs to render the replay at one instant
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub username: String,
    pub subject_id: u32,
    pub cursor: Option<NaiveDateTime>,
    pub state: SchedulerState,
    pub rate: PlaybackRate,
    pub rate_symbol: &'static str,
    pub interval_ms: u64,
    pub plot_resolution: Resolution,
    pub short_stats_resolution: Resolution,
    pub long_stats_resolution: Resolution,
    pub plot: Option<PlotView>,
    pub short_stats: Option<StatsView>,
    pub long_stats: Option<StatsView>,
    pub ended: bool,
}

enum SessionCommand {
    /// `None` cycles to the next rate
    SetRate(Option<PlaybackRate>, oneshot::Sender<SessionSnapshot>),
    SetResolution(ReaderKind, Resolution, oneshot::Sender<Result<SessionSnapshot>>),
    Resume(oneshot::Sender<SessionSnapshot>),
    Logout(oneshot::Sender<SessionSnapshot>),
}

enum SessionEvent {
    Resolved {
        attempt: u64,
        result: Result<NaiveDateTime>,
    },
    AdvanceCompleted {
        request: AdvanceRequest,
        result: anyhow::Result<Vec<Sample>>,
    },
    ReaderLoaded {
        request: ReaderRequest,
        result: anyhow::Result<ReaderView>,
    },
}

/// Cheap, cloneable access to a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub async fn cycle_rate(&self) -> Result<SessionSnapshot> {
        self.request(|reply| SessionCommand::SetRate(None, reply)).await
    }

    pub async fn set_rate(&self, rate: PlaybackRate) -> Result<SessionSnapshot> {
        self.request(|reply| SessionCommand::SetRate(Some(rate), reply)).await
    }

    pub async fn set_resolution(
        &self,
        kind: ReaderKind,
        resolution: Resolution,
    ) -> Result<SessionSnapshot> {
        self.request(|reply| SessionCommand::SetResolution(kind, resolution, reply))
            .await?
    }

    /// Re-resolve the cursor from the checkpoint store
    pub async fn resume(&self) -> Result<SessionSnapshot> {
        self.request(SessionCommand::Resume).await
    }

    /// End the session after a final checkpoint flush
    pub async fn logout(&self) -> Result<SessionSnapshot> {
        self.request(SessionCommand::Logout).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| ReplayError::SessionClosed)?;
        rx.await.map_err(|_| ReplayError::SessionClosed)
    }
}

pub struct ReplaySession;

impl ReplaySession {
    /// Spawn the owner task for one user session
    pub fn spawn(
        identity: SessionIdentity,
        settings: SessionSettings,
        source: Arc<dyn TimeSeriesSource>,
        store: Arc<dyn CheckpointStore>,
    ) -> Result<(SessionHandle, JoinHandle<()>)> {
        let plot = WindowReader::new(ReaderKind::Plot, settings.plot_resolution)?;
        let short_stats = WindowReader::new(ReaderKind::ShortStats, settings.short_stats_resolution)?;
        let long_stats = WindowReader::new(ReaderKind::LongStats, settings.long_stats_resolution)?;

        let checkpoints = CheckpointSynchronizer::new(store, source.clone());
        let mirror = checkpoints.mirror(identity.username.clone());
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events) = mpsc::unbounded_channel();

        let mut actor = SessionActor {
            identity,
            source,
            checkpoints,
            mirror: Some(mirror),
            cursor: Cursor::new(),
            scheduler: PlaybackScheduler::new(settings.rate, settings.plot_resolution),
            plot,
            short_stats,
            long_stats,
            timer: None,
            resolve_attempt: 0,
            ended: false,
            commands,
            events_tx,
            events,
            snapshots: None,
        };
        let (snapshots_tx, snapshots) = watch::channel(actor.snapshot());
        actor.snapshots = Some(snapshots_tx);

        let handle = tokio::spawn(actor.run());
        Ok((
            SessionHandle {
                commands: commands_tx,
                snapshots,
            },
            handle,
        ))
    }
}

struct SessionActor {
    identity: SessionIdentity,
    source: Arc<dyn TimeSeriesSource>,
    checkpoints: CheckpointSynchronizer,
    mirror: Option<CheckpointMirror>,
    cursor: Cursor,
    scheduler: PlaybackScheduler,
    plot: WindowReader,
    short_stats: WindowReader,
    long_stats: WindowReader,
    timer: Option<Interval>,
    resolve_attempt: u64,
    ended: bool,
    commands: mpsc::Receiver<SessionCommand>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    snapshots: Option<watch::Sender<SessionSnapshot>>,
}

impl SessionActor {
    async fn run(mut self) {
        tracing::info!(
            username = %self.identity.username,
            subject_id = self.identity.subject_id,
            "replay session started"
        );
        self.begin_resolve();
        self.refresh_readers();

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let keep_running = match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            self.teardown().await;
                            false
                        }
                    };
                    if !keep_running {
                        break;
                    }
                }
                Some(event) = self.events.recv() => self.handle_event(event),
                _ = next_tick(&mut self.timer) => self.on_tick(),
            }
        }

        tracing::info!(username = %self.identity.username, "replay session ended");
    }

    /// Returns false once the session has ended
    async fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::SetRate(rate, reply) => {
                let rate = rate.unwrap_or_else(|| self.scheduler.rate().next());
                if self.scheduler.set_rate(rate) {
                    self.arm_timer();
                }
                tracing::info!(interval_ms = rate.interval_ms(), "playback rate set to {}", rate.symbol());
                let _ = reply.send(self.publish());
            }
            SessionCommand::SetResolution(kind, resolution, reply) => {
                let result = self.set_resolution(kind, resolution).map(|()| self.publish());
                let _ = reply.send(result);
            }
            SessionCommand::Resume(reply) => {
                self.begin_resolve();
                let _ = reply.send(self.publish());
            }
            SessionCommand::Logout(reply) => {
                let snapshot = self.teardown().await;
                let _ = reply.send(snapshot);
                return false;
            }
        }
        true
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Resolved { attempt, result } => self.on_resolved(attempt, result),
            SessionEvent::AdvanceCompleted { request, result } => {
                match self.scheduler.complete_tick(request, result, &mut self.cursor) {
                    TickOutcome::Advanced(timestamp) => {
                        tracing::debug!(%timestamp, "cursor advanced");
                        self.cursor_changed(timestamp);
                    }
                    TickOutcome::EndOfHistory => {
                        tracing::info!(cursor = ?self.cursor.value(), "end of recorded history, playback stalled");
                        self.timer = None;
                    }
                    TickOutcome::Failed => {}
                    TickOutcome::Superseded => {
                        tracing::debug!(seq = request.seq, "discarding superseded advance");
                    }
                }
            }
            SessionEvent::ReaderLoaded { request, result } => {
                let reader = self.reader_mut(request.kind);
                match result {
                    Ok(view) => {
                        if !reader.apply(&request, view) {
                            tracing::debug!(reader = request.kind.name(), seq = request.seq, "discarding superseded view");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(reader = request.kind.name(), "{}", ReplayError::Fetch(e));
                    }
                }
            }
        }
        self.publish();
    }

    fn on_resolved(&mut self, attempt: u64, result: Result<NaiveDateTime>) {
        if attempt != self.resolve_attempt {
            return;
        }

        match result {
            Ok(timestamp) => {
                self.cursor.resume(timestamp);
                self.scheduler.start();
                self.arm_timer();
                self.cursor_changed(timestamp);
            }
            Err(e) => {
                tracing::warn!(
                    username = %self.identity.username,
                    cursor = ?self.cursor.value(),
                    "cursor not resolved: {}",
                    e
                );
            }
        }
    }

    fn on_tick(&mut self) {
        let Some(request) = self.scheduler.begin_tick(&self.cursor) else {
            return;
        };

        let source = self.source.clone();
        let identity = self.identity.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = source
                .fetch_window(&identity, request.resolution, Some(request.dispatched.value))
                .await;
            let _ = events.send(SessionEvent::AdvanceCompleted { request, result });
        });
    }

    /// The current cursor and timer stay live until the new value arrives
    fn begin_resolve(&mut self) {
        self.resolve_attempt += 1;

        let attempt = self.resolve_attempt;
        let checkpoints = self.checkpoints.clone();
        let identity = self.identity.clone();
        let resolution = self.plot.resolution();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = checkpoints.resolve_initial(&identity, resolution).await;
            let _ = events.send(SessionEvent::Resolved { attempt, result });
        });
    }

    fn set_resolution(&mut self, kind: ReaderKind, resolution: Resolution) -> Result<()> {
        if !self.reader_mut(kind).set_resolution(resolution)? {
            return Ok(());
        }
        if kind == ReaderKind::Plot {
            self.scheduler.set_resolution(resolution);
        }
        tracing::info!(reader = kind.name(), %resolution, "resolution changed");
        self.dispatch_reader(kind);
        Ok(())
    }

    fn cursor_changed(&mut self, timestamp: NaiveDateTime) {
        if let Some(mirror) = &self.mirror {
            mirror.persist(timestamp);
        }
        self.refresh_readers();
    }

    fn refresh_readers(&mut self) {
        for kind in ReaderKind::ALL {
            self.dispatch_reader(kind);
        }
    }

    fn dispatch_reader(&mut self, kind: ReaderKind) {
        let cursor = self.cursor.value();
        let request = self.reader_mut(kind).request(cursor);

        let source = self.source.clone();
        let identity = self.identity.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = window_reader::load(source.as_ref(), &identity, request).await;
            let _ = events.send(SessionEvent::ReaderLoaded { request, result });
        });
    }

    /// Replace the periodic timer; the first tick fires one full interval from now
    fn arm_timer(&mut self) {
        if !self.scheduler.is_advancing() {
            self.timer = None;
            return;
        }
        let period = self.scheduler.rate().interval();
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(interval);
    }

    async fn teardown(&mut self) -> SessionSnapshot {
        self.timer = None;
        self.scheduler.reset();
        let last = self.cursor.take();

        if let Some(mirror) = self.mirror.take() {
            if let Err(e) = mirror.flush_on_teardown(last).await {
                tracing::warn!(username = %self.identity.username, "{}", e);
            }
        }

        self.ended = true;
        self.publish()
    }

    fn reader_mut(&mut self, kind: ReaderKind) -> &mut WindowReader {
        match kind {
            ReaderKind::Plot => &mut self.plot,
            ReaderKind::ShortStats => &mut self.short_stats,
            ReaderKind::LongStats => &mut self.long_stats,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let rate = self.scheduler.rate();
        SessionSnapshot {
            username: self.identity.username.clone(),
            subject_id: self.identity.subject_id,
            cursor: self.cursor.value(),
            state: self.scheduler.state(),
            rate,
            rate_symbol: rate.symbol(),
            interval_ms: rate.interval_ms(),
            plot_resolution: self.plot.resolution(),
            short_stats_resolution: self.short_stats.resolution(),
            long_stats_resolution: self.long_stats.resolution(),
            plot: self.plot.plot().cloned(),
            short_stats: self.short_stats.stats().cloned(),
            long_stats: self.long_stats.stats().cloned(),
            ended: self.ended,
        }
    }

    fn publish(&self) -> SessionSnapshot {
        let snapshot = self.snapshot();
        if let Some(tx) = &self.snapshots {
            tx.send_replace(snapshot.clone());
        }
        snapshot
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
