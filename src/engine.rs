use crate::api::StreamingService;
use crate::index::TrackIndex;
use crate::session::SessionInfo;
use crate::station::NowPlayingSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Fixed polling period.
pub const TICK_INTERVAL: Duration = Duration::from_secs(15);

/// Where the engine is within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Polling,
    Deciding,
    Appending,
}

/// What a single tick ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    FetchFailed,
    Unresolvable,
    AlreadyPresent(String),
    Appended(String),
    AppendFailed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub ticks: u64,
    pub appended: u64,
    pub already_present: u64,
    pub unresolvable: u64,
    pub fetch_failures: u64,
    pub append_failures: u64,
}

impl SyncStats {
    fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::FetchFailed => self.fetch_failures += 1,
            TickOutcome::Unresolvable => self.unresolvable += 1,
            TickOutcome::AlreadyPresent(_) => self.already_present += 1,
            TickOutcome::Appended(_) => self.appended += 1,
            TickOutcome::AppendFailed(_) => self.append_failures += 1,
        }
    }
}

/// Polls the station and appends unseen tracks to the managed playlist.
///
/// The engine exclusively owns the session's `TrackIndex`. Ticks run one at a
/// time through `&mut self`, so the check-then-append sequence for a track
/// can never overlap with another tick's.
pub struct SyncEngine {
    session: SessionInfo,
    index: TrackIndex,
    station: Arc<dyn NowPlayingSource>,
    service: Arc<dyn StreamingService>,
    state: SyncState,
    stats: SyncStats,
}

impl SyncEngine {
    pub fn new(
        session: SessionInfo,
        index: TrackIndex,
        station: Arc<dyn NowPlayingSource>,
        service: Arc<dyn StreamingService>,
    ) -> Self {
        Self {
            session,
            index,
            station,
            service,
            state: SyncState::Idle,
            stats: SyncStats::default(),
        }
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn index(&self) -> &TrackIndex {
        &self.index
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Run one poll-decide-append cycle.
    ///
    /// Failures never escape a tick. A failed append leaves the index
    /// untouched so the same track is tried again on the next tick that
    /// still reports it.
    pub async fn tick(&mut self) -> TickOutcome {
        let outcome = self.poll_and_apply().await;
        self.state = SyncState::Idle;
        self.stats.record(&outcome);
        outcome
    }

    async fn poll_and_apply(&mut self) -> TickOutcome {
        self.state = SyncState::Polling;
        let now_playing = match self.station.fetch_now_playing().await {
            Ok(np) => np,
            Err(e) => {
                warn!("Failed to fetch now playing: {}", e);
                return TickOutcome::FetchFailed;
            }
        };
        debug!(
            "Now playing: {:?} (started {:?}, length {:?}, id {:?})",
            now_playing.title, now_playing.started_at, now_playing.length, now_playing.streaming_track_id
        );

        self.state = SyncState::Deciding;
        let track_id = now_playing.streaming_track_id.trim();
        if track_id.is_empty() {
            debug!("{:?} is not resolvable on {}", now_playing.title, self.service.name());
            return TickOutcome::Unresolvable;
        }
        if self.index.contains(track_id) {
            debug!("{:?} ({}) already present in playlist", now_playing.title, track_id);
            return TickOutcome::AlreadyPresent(track_id.to_string());
        }

        self.state = SyncState::Appending;
        match self
            .service
            .append_track(&self.session.playlist.id, track_id)
            .await
        {
            Ok(()) => {
                self.index.add(track_id);
                info!(
                    "Added {:?} ({}) to playlist {}",
                    now_playing.title, track_id, self.session.playlist.id
                );
                TickOutcome::Appended(track_id.to_string())
            }
            Err(e) => {
                warn!("Failed to add {:?} ({}): {}", now_playing.title, track_id, e);
                TickOutcome::AppendFailed(track_id.to_string())
            }
        }
    }

    /// Tick every `TICK_INTERVAL` until `shutdown` turns true or its sender is
    /// dropped. The first tick fires one interval after the call. A tick in
    /// flight when shutdown arrives is abandoned. Returns the engine so the
    /// caller can inspect its final state.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Self {
        let mut ticker = tokio::time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            "Sync loop started for playlist {} (every {}s)",
            self.session.playlist.id,
            TICK_INTERVAL.as_secs()
        );

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = self.tick() => {}
            }
        }

        self.state = SyncState::Idle;
        info!("Sync loop stopped: {:?}", self.stats);
        self
    }

    /// Start the loop on a background task.
    pub fn spawn(self) -> SyncHandle {
        let (tx, rx) = watch::channel(false);
        SyncHandle {
            shutdown: tx,
            task: tokio::spawn(self.run(rx)),
        }
    }
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // sender gone: nobody can stop us any more, so stop now
            return;
        }
    }
}

/// Handle to a running sync loop. Dropping it also stops the loop.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<SyncEngine>,
}

impl SyncHandle {
    /// Signal shutdown and wait for the loop to exit.
    pub async fn stop(self) -> Result<SyncStats, JoinError> {
        let _ = self.shutdown.send(true);
        let engine = self.task.await?;
        Ok(engine.stats)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
