//! AI traffic simulation.
//!
//! On every tick the engine loads the shared snapshot, walks the flow of each
//! AI-owned junction by a bounded random delta, rederives its status, and
//! saves the result. Manual junctions are copied through untouched.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::DomainResult;
use crate::domain::models::{SimulationSettings, TrafficSnapshot};
use crate::domain::ports::{update_snapshot, JunctionStore};

/// Configuration for the simulation engine.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Interval between ticks.
    pub tick_interval: Duration,
    /// Smallest flow change per tick (inclusive).
    pub delta_min: i32,
    /// Largest flow change per tick (inclusive).
    pub delta_max: i32,
    /// Fixed RNG seed for reproducible walks.
    pub seed: Option<u64>,
    /// Attempts per tick when another writer moves the version.
    pub max_conflict_retries: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            delta_min: -5,
            delta_max: 4,
            seed: None,
            max_conflict_retries: 5,
        }
    }
}

impl SimulationConfig {
    /// Create config with custom interval.
    pub fn with_interval(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            ..Default::default()
        }
    }
}

impl From<&SimulationSettings> for SimulationConfig {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            tick_interval: Duration::from_millis(settings.tick_interval_ms),
            delta_min: settings.delta_min,
            delta_max: settings.delta_max,
            seed: settings.seed,
            max_conflict_retries: settings.max_conflict_retries,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick_number: u64,
    /// Store version the tick wrote
    pub version: u64,
    /// AI-owned junctions whose flow was walked
    pub advanced: usize,
    /// Manual junctions copied through
    pub manual_skipped: usize,
}

/// Event emitted by the running engine.
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    /// Engine started.
    Started,
    /// A tick committed.
    TickCompleted { report: TickReport },
    /// A tick was skipped; the next one runs normally.
    TickSkipped { tick_number: u64, error: String },
    /// Engine stopped.
    Stopped,
}

/// Running counters for the engine.
#[derive(Debug, Clone, Default)]
pub struct EngineStatus {
    /// Whether the schedule is running.
    pub running: bool,
    /// Ticks attempted.
    pub total_ticks: u64,
    /// Ticks that committed.
    pub completed_ticks: u64,
    /// Ticks skipped because of store errors.
    pub skipped_ticks: u64,
    /// Time of the last committed tick.
    pub last_tick: Option<Instant>,
    /// Version written by the last committed tick.
    pub last_version: Option<u64>,
}

/// Handle to control a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    shutdown: CancellationToken,
    status: Arc<RwLock<EngineStatus>>,
}

impl EngineHandle {
    /// Request the engine to stop. Takes effect at the next timer wait.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Get current engine status.
    pub async fn status(&self) -> EngineStatus {
        self.status.read().await.clone()
    }
}

/// Counts from advancing one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceCounts {
    pub advanced: usize,
    pub manual_skipped: usize,
}

/// Walk every AI-owned junction by a uniform delta in `delta_min..=delta_max`.
pub fn advance_snapshot<R: Rng + ?Sized>(
    snapshot: &mut TrafficSnapshot,
    rng: &mut R,
    delta_min: i32,
    delta_max: i32,
) -> AdvanceCounts {
    let mut counts = AdvanceCounts::default();
    for junction in &mut snapshot.junctions {
        if junction.is_manual {
            counts.manual_skipped += 1;
            continue;
        }
        let delta = rng.gen_range(delta_min..=delta_max);
        junction.advance(delta);
        counts.advanced += 1;
    }
    counts
}

/// Periodic AI simulation over the shared store.
pub struct SimulationEngine {
    store: Arc<dyn JunctionStore>,
    config: SimulationConfig,
    rng: Mutex<StdRng>,
    status: Arc<RwLock<EngineStatus>>,
    shutdown: CancellationToken,
}

impl SimulationEngine {
    /// Create a new engine.
    pub fn new(store: Arc<dyn JunctionStore>, config: SimulationConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            store,
            config,
            rng: Mutex::new(rng),
            status: Arc::new(RwLock::new(EngineStatus::default())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults(store: Arc<dyn JunctionStore>) -> Self {
        Self::new(store, SimulationConfig::default())
    }

    /// Get a handle to control the engine.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            shutdown: self.shutdown.clone(),
            status: self.status.clone(),
        }
    }

    /// Get configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Get current status.
    pub async fn status(&self) -> EngineStatus {
        self.status.read().await.clone()
    }

    /// Run the engine on its own task, returning a channel for events.
    ///
    /// Events are dropped rather than queued when the receiver falls behind,
    /// so an idle receiver never holds up a tick.
    pub fn run(self) -> mpsc::Receiver<SimulationEvent> {
        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            self.run_loop(tx).await;
        });

        rx
    }

    /// Main engine loop.
    async fn run_loop(self, tx: mpsc::Sender<SimulationEvent>) {
        self.status.write().await.running = true;
        let _ = tx.try_send(SimulationEvent::Started);
        tracing::info!(
            tick_interval = ?self.config.tick_interval,
            "simulation engine started"
        );

        let start = Instant::now() + self.config.tick_interval;
        let mut timer = interval_at(start, self.config.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = timer.tick() => {
                    match self.tick().await {
                        Ok(report) => {
                            let _ = tx.try_send(SimulationEvent::TickCompleted { report });
                        }
                        Err(e) => {
                            let tick_number = self.status.read().await.total_ticks;
                            let _ = tx.try_send(SimulationEvent::TickSkipped {
                                tick_number,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        self.status.write().await.running = false;
        let _ = tx.try_send(SimulationEvent::Stopped);
        tracing::info!("simulation engine stopped");
    }

    /// Run a single tick now.
    ///
    /// A store error skips the tick and is returned; conflicts with other
    /// writers are retried from a fresh load inside the tick.
    pub async fn tick(&self) -> DomainResult<TickReport> {
        let tick_number = {
            let mut status = self.status.write().await;
            status.total_ticks += 1;
            status.total_ticks
        };

        let (delta_min, delta_max) = (self.config.delta_min, self.config.delta_max);
        let result = update_snapshot(
            self.store.as_ref(),
            self.config.max_conflict_retries,
            |snapshot| {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                Ok(advance_snapshot(snapshot, &mut *rng, delta_min, delta_max))
            },
        )
        .await;

        match result {
            Ok(committed) => {
                let report = TickReport {
                    tick_number,
                    version: committed.version,
                    advanced: committed.value.advanced,
                    manual_skipped: committed.value.manual_skipped,
                };
                {
                    let mut status = self.status.write().await;
                    status.completed_ticks += 1;
                    status.last_tick = Some(Instant::now());
                    status.last_version = Some(committed.version);
                }
                tracing::debug!(
                    tick_number,
                    version = report.version,
                    advanced = report.advanced,
                    manual = report.manual_skipped,
                    "simulation tick committed"
                );
                Ok(report)
            }
            Err(e) => {
                self.status.write().await.skipped_ticks += 1;
                tracing::warn!(tick_number, error = %e, "simulation tick skipped");
                Err(e)
            }
        }
    }
}
