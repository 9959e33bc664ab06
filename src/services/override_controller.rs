//! Operator override controller.
//!
//! Executes operator commands against single junctions:
//! - release-to-AI: drop manual ownership, keep flow/status
//! - instant-block: manual, flow 10, congested, in one write
//! - timed-clear: take manual ownership now, then ramp flow to 100 over the
//!   clear duration, one fresh read-modify-write per step
//!
//! Every command on a junction cancels that junction's running animation
//! before it commits. Each animation step checks its token after loading the
//! snapshot, and saves are compare-and-swap, so a step can never land on top
//! of a newer command's write.
//!
//! Commands issued by another controller (another process on the same store)
//! cannot reach this controller's tokens. Instead each step compares the
//! stored junction with the record it last committed; any other writer
//! changing it, including a newer timed clear stamping its own `clear_id`,
//! ends the animation as superseded.

use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    clamp_flow, Command, Junction, JunctionId, OverrideAction, OverrideSettings, CLEARED_FLOW,
};
use crate::domain::ports::{update_snapshot, JunctionStore};

/// Configuration for operator overrides.
#[derive(Debug, Clone)]
pub struct OverrideConfig {
    /// Total duration of a timed clear.
    pub clear_duration: Duration,
    /// Interval between timed clear steps.
    pub step_interval: Duration,
    /// Attempts per write when another writer moves the version.
    pub max_conflict_retries: u32,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            clear_duration: Duration::from_millis(5000),
            step_interval: Duration::from_millis(100),
            max_conflict_retries: 5,
        }
    }
}

impl From<&OverrideSettings> for OverrideConfig {
    fn from(settings: &OverrideSettings) -> Self {
        Self {
            clear_duration: Duration::from_millis(settings.clear_duration_ms),
            step_interval: Duration::from_millis(settings.step_interval_ms),
            max_conflict_retries: settings.max_conflict_retries,
        }
    }
}

impl OverrideConfig {
    fn effective_step(&self) -> Duration {
        self.step_interval.max(Duration::from_millis(1))
    }

    /// Number of steps a timed clear takes (50 for the reference timings).
    pub fn total_steps(&self) -> u32 {
        let step = self.effective_step().as_nanos();
        let steps = self.clear_duration.as_nanos().div_ceil(step).max(1);
        u32::try_from(steps).unwrap_or(u32::MAX)
    }
}

/// Flow after `elapsed` of a linear ramp from `start` to `target`, floored.
pub fn ramp_flow(start: u8, target: u8, elapsed: Duration, duration: Duration) -> u8 {
    if duration.is_zero() || elapsed >= duration {
        return target;
    }
    let span = i128::from(target) - i128::from(start);
    let elapsed = i128::try_from(elapsed.as_nanos()).unwrap_or(i128::MAX);
    let duration = i128::try_from(duration.as_nanos()).unwrap_or(i128::MAX);
    let progressed = (span * elapsed).div_euclid(duration);
    clamp_flow(i32::try_from(i128::from(start) + progressed).unwrap_or(i32::from(target)))
}

/// How an animation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnimationOutcome {
    /// Every step committed; the junction sits at flow 100.
    Completed,
    /// A newer command (or an explicit cancel) stopped the ramp.
    Cancelled,
    /// A store error ended the ramp early.
    Aborted { reason: String },
}

/// Summary of a finished timed clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimationReport {
    pub junction_id: JunctionId,
    pub start_flow: u8,
    pub steps_committed: u32,
    /// Last flow this animation wrote
    pub final_flow: u8,
    pub outcome: AnimationOutcome,
}

/// Handle onto a running timed clear.
///
/// Dropping the handle leaves the animation running.
#[derive(Debug)]
pub struct AnimationHandle {
    junction_id: JunctionId,
    generation: u64,
    token: CancellationToken,
    join: JoinHandle<AnimationReport>,
}

impl AnimationHandle {
    pub fn junction_id(&self) -> JunctionId {
        self.junction_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the animation to finish.
    pub async fn wait(self) -> AnimationReport {
        let junction_id = self.junction_id;
        match self.join.await {
            Ok(report) => report,
            Err(e) => AnimationReport {
                junction_id,
                start_flow: 0,
                steps_committed: 0,
                final_flow: 0,
                outcome: AnimationOutcome::Aborted {
                    reason: format!("animation task failed: {e}"),
                },
            },
        }
    }
}

/// Result of an accepted command.
#[derive(Debug)]
pub struct CommandOutcome {
    pub command: Command,
    /// The junction as committed by the command
    pub junction: Junction,
    /// Store version the command wrote
    pub version: u64,
    /// Present for timed clears
    pub animation: Option<AnimationHandle>,
}

#[derive(Debug)]
struct ActiveAnimation {
    generation: u64,
    token: CancellationToken,
}

type AnimationRegistry = Arc<Mutex<HashMap<JunctionId, ActiveAnimation>>>;

/// Applies operator commands to the shared store.
pub struct OverrideController {
    store: Arc<dyn JunctionStore>,
    config: OverrideConfig,
    animations: AnimationRegistry,
    next_generation: AtomicU64,
}

impl OverrideController {
    pub fn new(store: Arc<dyn JunctionStore>, config: OverrideConfig) -> Self {
        Self {
            store,
            config,
            animations: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn with_defaults(store: Arc<dyn JunctionStore>) -> Self {
        Self::new(store, OverrideConfig::default())
    }

    pub fn config(&self) -> &OverrideConfig {
        &self.config
    }

    /// Execute one operator command.
    ///
    /// Unknown junctions are rejected with `UnknownJunction` and nothing is
    /// written. Store errors abort the command without retry.
    #[tracing::instrument(skip(self, command), fields(junction_id = command.junction_id, action = %command.action))]
    pub async fn execute(&self, command: Command) -> DomainResult<CommandOutcome> {
        let result = match command.action {
            OverrideAction::ReleaseAi => self.apply_instant(command, Junction::release).await,
            OverrideAction::InstantBlock => self.apply_instant(command, Junction::block).await,
            OverrideAction::TimedClear => self.start_timed_clear(command).await,
        };

        match &result {
            Ok(outcome) => tracing::info!(
                version = outcome.version,
                flow = outcome.junction.flow,
                status = %outcome.junction.status,
                is_manual = outcome.junction.is_manual,
                "override command committed"
            ),
            Err(DomainError::UnknownJunction(_)) => {
                tracing::warn!("override command rejected: unknown junction");
            }
            Err(e) => tracing::warn!(error = %e, "override command failed"),
        }

        result
    }

    /// Cancel a running animation on `junction_id`. Returns whether one was running.
    pub async fn cancel(&self, junction_id: JunctionId) -> bool {
        let removed = self.animations.lock().await.remove(&junction_id);
        match removed {
            Some(active) => {
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Junctions with an animation still running, in id order.
    pub async fn active_animations(&self) -> Vec<JunctionId> {
        let mut ids: Vec<_> = self.animations.lock().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Cancel every running animation.
    pub async fn shutdown(&self) {
        let mut animations = self.animations.lock().await;
        for (_, active) in animations.drain() {
            active.token.cancel();
        }
    }

    async fn apply_instant(
        &self,
        command: Command,
        apply: fn(&mut Junction),
    ) -> DomainResult<CommandOutcome> {
        let id = command.junction_id;
        self.cancel(id).await;

        let committed = update_snapshot(
            self.store.as_ref(),
            self.config.max_conflict_retries,
            |snapshot| {
                let junction = snapshot.require_mut(id)?;
                apply(junction);
                Ok(junction.clone())
            },
        )
        .await?;

        Ok(CommandOutcome {
            command,
            junction: committed.value,
            version: committed.version,
            animation: None,
        })
    }

    async fn start_timed_clear(&self, command: Command) -> DomainResult<CommandOutcome> {
        let id = command.junction_id;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        // Register before phase 1 commits so any later command can find and
        // cancel this animation.
        {
            let mut animations = self.animations.lock().await;
            let previous = animations.insert(
                id,
                ActiveAnimation {
                    generation,
                    token: token.clone(),
                },
            );
            if let Some(previous) = previous {
                previous.token.cancel();
            }
        }

        let clear_id: u32 = rand::thread_rng().gen_range(1..=u32::MAX);
        let phase_one = update_snapshot(
            self.store.as_ref(),
            self.config.max_conflict_retries,
            |snapshot| {
                if token.is_cancelled() {
                    return Err(DomainError::Superseded(id));
                }
                let junction = snapshot.require_mut(id)?;
                junction.begin_clear(clear_id);
                Ok(junction.clone())
            },
        )
        .await;

        let committed = match phase_one {
            Ok(committed) => committed,
            Err(e) => {
                deregister(&self.animations, id, generation).await;
                return Err(e);
            }
        };

        let animation = Animation {
            store: self.store.clone(),
            registry: self.animations.clone(),
            config: self.config.clone(),
            junction_id: id,
            generation,
            start_flow: committed.value.flow,
            committed: committed.value.clone(),
            token: token.clone(),
        };
        let join = tokio::spawn(animation.run());

        Ok(CommandOutcome {
            command,
            junction: committed.value,
            version: committed.version,
            animation: Some(AnimationHandle {
                junction_id: id,
                generation,
                token,
                join,
            }),
        })
    }
}

async fn deregister(registry: &AnimationRegistry, id: JunctionId, generation: u64) {
    let mut animations = registry.lock().await;
    if animations.get(&id).is_some_and(|a| a.generation == generation) {
        animations.remove(&id);
    }
}

/// Phase 2 of a timed clear.
struct Animation {
    store: Arc<dyn JunctionStore>,
    registry: AnimationRegistry,
    config: OverrideConfig,
    junction_id: JunctionId,
    generation: u64,
    start_flow: u8,
    /// Record of the junction as this animation last wrote it
    committed: Junction,
    token: CancellationToken,
}

impl Animation {
    async fn run(mut self) -> AnimationReport {
        let id = self.junction_id;
        let step_interval = self.config.effective_step();
        let total_steps = self.config.total_steps();

        let mut timer = interval_at(Instant::now() + step_interval, step_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut steps_committed = 0u32;
        let mut final_flow = self.start_flow;
        let mut step = 0u32;

        tracing::debug!(
            junction_id = id,
            start_flow = self.start_flow,
            total_steps,
            "timed clear started"
        );

        let outcome = loop {
            tokio::select! {
                biased;
                () = self.token.cancelled() => break AnimationOutcome::Cancelled,
                _ = timer.tick() => {}
            }

            step += 1;
            // Elapsed is nominal (steps × interval) so the ramp always takes
            // exactly `total_steps` writes.
            let elapsed = step_interval.saturating_mul(step).min(self.config.clear_duration);
            let flow = ramp_flow(self.start_flow, CLEARED_FLOW, elapsed, self.config.clear_duration);

            let token = &self.token;
            let last_written = &self.committed;
            let result = update_snapshot(
                self.store.as_ref(),
                self.config.max_conflict_retries,
                |snapshot| {
                    if token.is_cancelled() {
                        return Err(DomainError::Superseded(id));
                    }
                    let junction = snapshot.require_mut(id)?;
                    if *junction != *last_written {
                        return Err(DomainError::Superseded(id));
                    }
                    junction.force_clear(flow);
                    Ok(junction.clone())
                },
            )
            .await;

            match result {
                Ok(step_commit) => {
                    steps_committed += 1;
                    final_flow = flow;
                    self.committed = step_commit.value;
                    tracing::debug!(junction_id = id, step, flow, version = step_commit.version, "timed clear step");
                }
                Err(DomainError::Superseded(_)) => break AnimationOutcome::Cancelled,
                Err(DomainError::ConcurrencyConflict { expected, actual }) => {
                    // Only this step is lost. Past the last step the target is
                    // 100, so the final write is retried on the next tick.
                    tracing::warn!(junction_id = id, step, expected, actual, "timed clear step skipped after repeated conflicts");
                    if step >= total_steps {
                        continue;
                    }
                }
                Err(e) => {
                    tracing::warn!(junction_id = id, step, error = %e, "timed clear aborted");
                    break AnimationOutcome::Aborted { reason: e.to_string() };
                }
            }

            if step >= total_steps {
                break AnimationOutcome::Completed;
            }
        };

        deregister(&self.registry, id, self.generation).await;

        match &outcome {
            AnimationOutcome::Completed => {
                tracing::info!(junction_id = id, steps_committed, final_flow, "timed clear completed");
            }
            AnimationOutcome::Cancelled => {
                tracing::info!(junction_id = id, steps_committed, final_flow, "timed clear cancelled");
            }
            AnimationOutcome::Aborted { .. } => {}
        }

        AnimationReport {
            junction_id: id,
            start_flow: self.start_flow,
            steps_committed,
            final_flow,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryJunctionStore;
    use crate::domain::models::FlowStatus;

    fn controller() -> (Arc<InMemoryJunctionStore>, OverrideController) {
        let store = Arc::new(InMemoryJunctionStore::new());
        let controller = OverrideController::with_defaults(store.clone());
        (store, controller)
    }

    #[test]
    fn test_total_steps() {
        assert_eq!(OverrideConfig::default().total_steps(), 50);
        let uneven = OverrideConfig {
            clear_duration: Duration::from_millis(250),
            step_interval: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(uneven.total_steps(), 3);
    }

    #[test]
    fn test_ramp_flow() {
        let duration = Duration::from_millis(5000);
        assert_eq!(ramp_flow(15, 100, Duration::ZERO, duration), 15);
        assert_eq!(ramp_flow(15, 100, Duration::from_millis(2500), duration), 57);
        assert_eq!(ramp_flow(15, 100, Duration::from_millis(100), duration), 16);
        assert_eq!(ramp_flow(15, 100, duration, duration), 100);
        assert_eq!(ramp_flow(15, 100, Duration::from_secs(60), duration), 100);
        assert_eq!(ramp_flow(100, 100, Duration::from_millis(2500), duration), 100);
        assert_eq!(ramp_flow(40, 100, Duration::from_millis(1), Duration::ZERO), 100);
    }

    #[tokio::test]
    async fn test_block_sets_fixed_values() {
        let (store, controller) = controller();
        let outcome = controller.execute(Command::instant_block(1)).await.unwrap();
        assert!(outcome.animation.is_none());
        assert_eq!(outcome.junction.flow, 10);
        assert_eq!(outcome.junction.status, FlowStatus::Congested);
        assert!(outcome.junction.is_manual);

        let stored = store.load().await.unwrap();
        assert_eq!(stored.version, outcome.version);
        assert_eq!(stored.snapshot.get(1), Some(&outcome.junction));
    }

    #[tokio::test]
    async fn test_unknown_junction_rejected() {
        let (store, controller) = controller();
        for command in [
            Command::release_ai(9999),
            Command::instant_block(9999),
            Command::timed_clear(9999),
        ] {
            let err = controller.execute(command).await.unwrap_err();
            assert!(matches!(err, DomainError::UnknownJunction(9999)));
        }
        assert_eq!(store.version().await, 0);
        assert!(controller.active_animations().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_clear_stamps_and_block_clears_clear_id() {
        let (store, controller) = controller();
        let clear = controller.execute(Command::timed_clear(4)).await.unwrap();
        let clear_id = clear.junction.clear_id.expect("phase 1 stamps a clear id");
        assert_eq!(store.load().await.unwrap().snapshot.get(4).unwrap().clear_id, Some(clear_id));

        let block = controller.execute(Command::instant_block(4)).await.unwrap();
        assert_eq!(block.junction.clear_id, None);
        assert_eq!(clear.animation.unwrap().wait().await.outcome, AnimationOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reports_running_animation() {
        let (_store, controller) = controller();
        let outcome = controller.execute(Command::timed_clear(2)).await.unwrap();
        assert_eq!(controller.active_animations().await, vec![2]);

        assert!(controller.cancel(2).await);
        assert!(!controller.cancel(2).await);

        let report = outcome.animation.unwrap().wait().await;
        assert_eq!(report.outcome, AnimationOutcome::Cancelled);
        assert!(controller.active_animations().await.is_empty());
    }
}
