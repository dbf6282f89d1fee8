//! Async session: one task owns the engine and the profile tracker.
//!
//! Player commands, the tick timer, and the auto-water timer all funnel into
//! a single `select!` loop, so no two mutations ever interleave. Saves are
//! handed to a separate saver task and never block command handling.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use garden_core::prelude::*;
//!
//! # async fn run() -> Result<(), SessionError> {
//! let session = GardenSession::start(
//!     GardenConfig::default(),
//!     Arc::new(Catalog::standard()),
//!     Arc::new(MemoryGateway::new()),
//!     Arc::new(SystemClock),
//! )
//! .await?;
//! session
//!     .execute(Command::Plant { plot: 0, plant_id: "tomato".into() })
//!     .await?;
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use garden_logic::achievements::{ProfileStats, StatsDelta};
use garden_logic::catalog::Catalog;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{ConfigError, GardenConfig};
use crate::engine::{Command, CommandOutcome, GardenEngine};
use crate::offline::{self, OfflineReport};
use crate::persistence::{self, PersistenceGateway, SaveBatch, GAME_STATE_KEY};
use crate::profile::{ProfileError, ProfileTracker, UserProfile};
use crate::state::GameState;

const REQUEST_QUEUE: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

enum Request {
    Command(Command, oneshot::Sender<CommandOutcome>),
    Snapshot(oneshot::Sender<GameState>),
    Profile(oneshot::Sender<Option<UserProfile>>),
    CreateProfile {
        username: String,
        avatar: Option<String>,
        reply: oneshot::Sender<Result<UserProfile, ProfileError>>,
    },
    SwitchProfile(String, oneshot::Sender<Result<(), ProfileError>>),
    DeleteProfile(String, oneshot::Sender<Result<(), ProfileError>>),
    ClearProfile(oneshot::Sender<()>),
    Leaderboard(oneshot::Sender<Vec<UserProfile>>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running garden session.
pub struct GardenSession {
    requests: mpsc::Sender<Request>,
    actor: Mutex<Option<JoinHandle<()>>>,
    offline: OfflineReport,
}

impl GardenSession {
    /// Load the saved garden and profiles, reconcile offline growth, and
    /// start the session task.
    ///
    /// A missing or unreadable save starts a fresh garden; only an invalid
    /// configuration is an error.
    pub async fn start(
        config: GardenConfig,
        catalog: Arc<Catalog>,
        gateway: Arc<dyn PersistenceGateway>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let now = clock.now_ms();

        let mut report = OfflineReport::default();
        let engine = match persistence::load_game_state(gateway.as_ref()).await {
            Ok(Some(mut state)) => {
                // Repair first: offline growth only counts an unlocked pet.
                state.sanitize(&catalog, config.plot_count);
                report = offline::reconcile(
                    &mut state,
                    &catalog,
                    now,
                    config.offline_min_elapsed_ms,
                );
                info!(coins = state.coins, "garden loaded");
                GardenEngine::from_state(state, config.clone(), catalog.clone(), clock)
            }
            Ok(None) => {
                info!("no saved garden, starting fresh");
                GardenEngine::new(config.clone(), catalog.clone(), clock)
            }
            Err(e) => {
                warn!(error = %e, "failed to load garden, starting fresh");
                GardenEngine::new(config.clone(), catalog.clone(), clock)
            }
        };

        let tracker = match ProfileTracker::load(gateway.as_ref()).await {
            Ok(tracker) => tracker,
            Err(e) => {
                warn!(error = %e, "failed to load profiles");
                ProfileTracker::default()
            }
        };

        let (save_tx, save_rx) = mpsc::unbounded_channel();
        let saver = tokio::spawn(persistence::run_saver(gateway, save_rx));

        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE);
        let actor = Actor {
            engine,
            tracker,
            saves: save_tx,
            profile_dirty: false,
        };
        let handle = tokio::spawn(actor.run(request_rx, saver));

        Ok(Self {
            requests: request_tx,
            actor: Mutex::new(Some(handle)),
            offline: report,
        })
    }

    /// What offline reconciliation did at startup.
    pub fn offline_report(&self) -> OfflineReport {
        self.offline
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(make(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn execute(&self, command: Command) -> Result<CommandOutcome, SessionError> {
        self.request(|tx| Request::Command(command, tx)).await
    }

    pub async fn snapshot(&self) -> Result<GameState, SessionError> {
        self.request(Request::Snapshot).await
    }

    pub async fn profile(&self) -> Result<Option<UserProfile>, SessionError> {
        self.request(Request::Profile).await
    }

    pub async fn create_profile(
        &self,
        username: &str,
        avatar: Option<&str>,
    ) -> Result<UserProfile, SessionError> {
        let username = username.to_string();
        let avatar = avatar.map(str::to_string);
        Ok(self
            .request(|reply| Request::CreateProfile {
                username,
                avatar,
                reply,
            })
            .await??)
    }

    pub async fn switch_profile(&self, id: &str) -> Result<(), SessionError> {
        Ok(self
            .request(|tx| Request::SwitchProfile(id.to_string(), tx))
            .await??)
    }

    pub async fn delete_profile(&self, id: &str) -> Result<(), SessionError> {
        Ok(self
            .request(|tx| Request::DeleteProfile(id.to_string(), tx))
            .await??)
    }

    pub async fn clear_profile(&self) -> Result<(), SessionError> {
        self.request(Request::ClearProfile).await
    }

    /// Every profile on the device, best score first.
    pub async fn leaderboard(&self) -> Result<Vec<UserProfile>, SessionError> {
        self.request(Request::Leaderboard).await
    }

    /// Save everything, stop the timers, and wait for pending writes. Later
    /// calls on this handle return [`SessionError::Closed`].
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(Request::Shutdown).await?;
        let handle = self.actor.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "session task ended abnormally");
            }
        }
        Ok(())
    }
}

struct Actor {
    engine: GardenEngine,
    tracker: ProfileTracker,
    saves: mpsc::UnboundedSender<SaveBatch>,
    /// Profile changes not yet saved (play time only).
    profile_dirty: bool,
}

impl Actor {
    async fn run(mut self, mut requests: mpsc::Receiver<Request>, saver: JoinHandle<()>) {
        let tick_period = Duration::from_millis(self.engine.config().tick_period_ms);
        let water_period = Duration::from_millis(self.engine.config().auto_water_period_ms);
        let mut tick = time::interval_at(Instant::now() + tick_period, tick_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut water = time::interval_at(Instant::now() + water_period, water_period);
        water.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown_reply = loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.execute(Command::Tick);
                }
                _ = water.tick() => {
                    self.execute(Command::AutoWater);
                    if self.profile_dirty {
                        self.persist(false, true);
                    }
                }
                request = requests.recv() => match request {
                    Some(Request::Shutdown(reply)) => break Some(reply),
                    Some(request) => self.handle(request),
                    None => break None,
                },
            }
        };

        self.persist(true, true);
        let Actor { saves, .. } = self;
        drop(saves);
        if let Err(e) = saver.await {
            warn!(error = %e, "saver task ended abnormally");
        }
        info!("session stopped");
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Command(command, reply) => {
                let outcome = self.execute(command);
                let _ = reply.send(outcome);
            }
            Request::Snapshot(reply) => {
                let _ = reply.send(self.engine.state().clone());
            }
            Request::Profile(reply) => {
                let _ = reply.send(self.tracker.current().cloned());
            }
            Request::CreateProfile {
                username,
                avatar,
                reply,
            } => {
                let starting = ProfileStats::starting(
                    self.engine.catalog().starter_plants().len() as u64,
                    self.engine.config().starting_coins,
                );
                let now = self.engine.now_ms();
                let result = self
                    .tracker
                    .create_profile(&username, avatar.as_deref(), starting, now)
                    .cloned();
                if result.is_ok() {
                    self.persist(false, true);
                }
                let _ = reply.send(result);
            }
            Request::SwitchProfile(id, reply) => {
                let result = self.tracker.switch_profile(&id);
                if result.is_ok() {
                    self.persist(false, true);
                }
                let _ = reply.send(result);
            }
            Request::DeleteProfile(id, reply) => {
                let result = self.tracker.delete_profile(&id);
                if result.is_ok() {
                    self.persist(false, true);
                }
                let _ = reply.send(result);
            }
            Request::ClearProfile(reply) => {
                self.tracker.clear_profile();
                self.persist(false, true);
                let _ = reply.send(());
            }
            Request::Leaderboard(reply) => {
                let board = self.tracker.leaderboard().into_iter().cloned().collect();
                let _ = reply.send(board);
            }
            // Handled by the run loop.
            Request::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    /// Apply a command, mirror its stats into the profile, and schedule a
    /// save if anything changed.
    fn execute(&mut self, command: Command) -> CommandOutcome {
        if !command.is_periodic() {
            debug!(?command, "player command");
        }
        let outcome = self.engine.apply(command);

        let mut merged = StatsDelta::default();
        for delta in self.engine.take_stat_deltas() {
            merged.merge(&delta);
        }
        let mut profile_changed = false;
        if !merged.is_empty() && self.tracker.current().is_some() {
            let now = self.engine.now_ms();
            let unlocked = self.tracker.update_stats(&merged, now);
            let play_time_only = merged == StatsDelta::play_time(merged.play_time);
            if play_time_only && unlocked.is_empty() {
                self.profile_dirty = true;
            } else {
                profile_changed = true;
            }
        }

        if outcome.mutated() || profile_changed {
            self.persist(outcome.mutated(), profile_changed);
        }
        outcome
    }

    /// Queue a save of the garden and/or the profiles.
    fn persist(&mut self, game: bool, profiles: bool) {
        let mut batch = SaveBatch::new();
        if game {
            let snapshot = self.engine.snapshot_for_save();
            match persistence::to_blob(GAME_STATE_KEY, &snapshot) {
                Ok(blob) => batch.push((GAME_STATE_KEY, Some(blob))),
                Err(e) => warn!(error = %e, "failed to serialize garden"),
            }
        }
        if profiles || self.profile_dirty {
            match self.tracker.save_batch() {
                Ok(writes) => {
                    batch.extend(writes);
                    self.profile_dirty = false;
                }
                Err(e) => warn!(error = %e, "failed to serialize profiles"),
            }
        }
        if batch.is_empty() {
            return;
        }
        debug!(writes = batch.len(), "save queued");
        if self.saves.send(batch).is_err() {
            warn!("saver is gone, dropping save");
        }
    }
}
