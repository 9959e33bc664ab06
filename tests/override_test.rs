//! Operator overrides, including timed clears racing other writers.

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use common::{junction, FlakyStore};
use traffic_sync::adapters::memory::InMemoryJunctionStore;
use traffic_sync::adapters::sqlite::{initialize_database, SqliteJunctionStore};
use traffic_sync::domain::models::{Command, FlowStatus};
use traffic_sync::services::{
    AnimationOutcome, OverrideConfig, OverrideController, SimulationConfig, SimulationEngine,
};
use traffic_sync::{DomainError, JunctionStore};

fn setup() -> (Arc<InMemoryJunctionStore>, OverrideController) {
    let store = Arc::new(InMemoryJunctionStore::new());
    let controller = OverrideController::with_defaults(store.clone());
    (store, controller)
}

#[tokio::test(start_paused = true)]
async fn test_timed_clear_runs_to_completion() {
    let (store, controller) = setup();

    let outcome = controller.execute(Command::timed_clear(3)).await.unwrap();
    assert!(outcome.junction.is_manual);
    assert_eq!(outcome.junction.flow, 15, "phase 1 keeps the flow");
    assert_eq!(controller.active_animations().await, vec![3]);

    let report = outcome.animation.expect("timed clear has an animation").wait().await;
    assert_eq!(report.outcome, AnimationOutcome::Completed);
    assert_eq!(report.steps_committed, 50);
    assert_eq!(report.final_flow, 100);

    let j = junction(store.as_ref(), 3).await;
    assert!(j.is_manual);
    assert_eq!(j.flow, 100);
    assert_eq!(j.status, FlowStatus::Clear);
    assert!(controller.active_animations().await.is_empty());
    // phase 1 plus one write per step
    assert_eq!(store.version().await, 51);
}

#[tokio::test(start_paused = true)]
async fn test_timed_clear_midpoint() {
    let (store, controller) = setup();

    let _outcome = controller.execute(Command::timed_clear(3)).await.unwrap();
    sleep(Duration::from_millis(2550)).await;

    // start 15, halfway to 100 is 57.5
    let j = junction(store.as_ref(), 3).await;
    assert!((57..=58).contains(&j.flow), "flow at midpoint was {}", j.flow);
    assert_eq!(j.status, FlowStatus::Clear);
    assert!(j.is_manual);
}

#[tokio::test(start_paused = true)]
async fn test_block_during_clear_suppresses_later_steps() {
    let (store, controller) = setup();

    let clear = controller.execute(Command::timed_clear(3)).await.unwrap();
    let animation = clear.animation.unwrap();
    sleep(Duration::from_millis(1000)).await;

    let block = controller.execute(Command::instant_block(3)).await.unwrap();
    assert_eq!(block.junction.flow, 10);
    assert!(animation.is_cancelled());

    sleep(Duration::from_millis(6000)).await;

    let j = junction(store.as_ref(), 3).await;
    assert!(j.is_manual);
    assert_eq!(j.flow, 10);
    assert_eq!(j.status, FlowStatus::Congested);

    let report = animation.wait().await;
    assert_eq!(report.outcome, AnimationOutcome::Cancelled);
    assert!(report.steps_committed < 50);
    assert_eq!(store.version().await, block.version, "nothing written after the block");
}

#[tokio::test(start_paused = true)]
async fn test_second_clear_supersedes_first() {
    let (store, controller) = setup();

    let first = controller.execute(Command::timed_clear(9)).await.unwrap();
    sleep(Duration::from_millis(500)).await;
    let second = controller.execute(Command::timed_clear(9)).await.unwrap();

    let first = first.animation.unwrap();
    let second = second.animation.unwrap();
    assert!(second.generation() > first.generation());

    assert_eq!(first.wait().await.outcome, AnimationOutcome::Cancelled);
    let report = second.wait().await;
    assert_eq!(report.outcome, AnimationOutcome::Completed);
    assert_eq!(junction(store.as_ref(), 9).await.flow, 100);
}

#[tokio::test(start_paused = true)]
async fn test_release_is_idempotent_and_keeps_flow() {
    let (store, controller) = setup();
    controller.execute(Command::instant_block(5)).await.unwrap();
    let mut expected = store.load().await.unwrap().snapshot;
    expected.get_mut(5).unwrap().release();

    let once = controller.execute(Command::release_ai(5)).await.unwrap();
    let twice = controller.execute(Command::release_ai(5)).await.unwrap();

    assert!(!once.junction.is_manual);
    assert_eq!(once.junction.flow, 10);
    assert_eq!(once.junction.status, FlowStatus::Congested);
    assert_eq!(once.junction, twice.junction);

    assert_eq!(store.load().await.unwrap().snapshot, expected, "only ownership changed");
}

#[tokio::test]
async fn test_instant_block_values() {
    let (_store, controller) = setup();
    for id in [1, 13, 24] {
        let outcome = controller.execute(Command::instant_block(id)).await.unwrap();
        assert!(outcome.junction.is_manual);
        assert_eq!(outcome.junction.flow, 10);
        assert_eq!(outcome.junction.status, FlowStatus::Congested);
        assert!(outcome.animation.is_none());
    }
}

#[tokio::test]
async fn test_unknown_junction_rejected_without_writes() {
    let (store, controller) = setup();
    let before = store.load().await.unwrap();

    for command in [
        Command::release_ai(9999),
        Command::timed_clear(9999),
        Command::instant_block(9999),
    ] {
        let err = controller.execute(command).await.unwrap_err();
        assert!(matches!(err, DomainError::UnknownJunction(9999)));
    }

    assert_eq!(store.version().await, 0);
    assert_eq!(store.load().await.unwrap(), before);
    assert!(controller.active_animations().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_outage_aborts_animation() {
    let store = FlakyStore::new();
    let controller = OverrideController::with_defaults(Arc::new(store.clone()));

    let outcome = controller.execute(Command::timed_clear(3)).await.unwrap();
    sleep(Duration::from_millis(350)).await;
    store.set_down(true);

    let report = outcome.animation.unwrap().wait().await;
    assert!(matches!(report.outcome, AnimationOutcome::Aborted { .. }));
    assert_eq!(report.steps_committed, 3);

    store.set_down(false);
    let j = junction(&store, 3).await;
    assert!(j.is_manual, "committed steps are not rolled back");
    assert!(j.flow > 15 && j.flow < 100);
}

#[tokio::test(start_paused = true)]
async fn test_clear_holds_against_running_simulation() {
    let (store, controller) = setup();
    let engine = SimulationEngine::new(
        store.clone(),
        SimulationConfig::with_interval(Duration::from_millis(250)),
    );
    let engine_handle = engine.handle();
    let _events = engine.run();

    let outcome = controller.execute(Command::timed_clear(22)).await.unwrap();
    let report = outcome.animation.unwrap().wait().await;
    assert_eq!(report.outcome, AnimationOutcome::Completed);

    sleep(Duration::from_secs(2)).await;
    engine_handle.stop();

    let j = junction(store.as_ref(), 22).await;
    assert!(j.is_manual);
    assert_eq!(j.flow, 100);
    assert_eq!(j.status, FlowStatus::Clear);
    assert!(engine_handle.status().await.completed_ticks >= 20);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_all_animations() {
    let (_store, controller) = setup();
    let a = controller.execute(Command::timed_clear(1)).await.unwrap().animation.unwrap();
    let b = controller.execute(Command::timed_clear(2)).await.unwrap().animation.unwrap();
    assert_eq!(controller.active_animations().await, vec![1, 2]);

    controller.shutdown().await;

    assert_eq!(a.wait().await.outcome, AnimationOutcome::Cancelled);
    assert_eq!(b.wait().await.outcome, AnimationOutcome::Cancelled);
    assert!(controller.active_animations().await.is_empty());
}

/// Each controller opens its own pool, like two CLI invocations on one file.
async fn sqlite_controller(path: &std::path::Path) -> (Arc<SqliteJunctionStore>, OverrideController) {
    let url = format!("sqlite:{}", path.display());
    let pool = initialize_database(&url, None).await.expect("database init failed");
    let store = Arc::new(SqliteJunctionStore::new(pool, "trafficState"));
    let config = OverrideConfig {
        clear_duration: Duration::from_millis(1000),
        step_interval: Duration::from_millis(20),
        ..Default::default()
    };
    let controller = OverrideController::new(store.clone(), config);
    (store, controller)
}

#[tokio::test]
async fn test_block_from_another_controller_stops_clear() {
    let (_dir, path) = common::temp_db_path();
    let (store, first) = sqlite_controller(&path).await;
    let (_other_store, second) = sqlite_controller(&path).await;

    let clear = first.execute(Command::timed_clear(3)).await.unwrap();
    sleep(Duration::from_millis(200)).await;
    second.execute(Command::instant_block(3)).await.unwrap();

    let report = clear.animation.unwrap().wait().await;
    assert_eq!(report.outcome, AnimationOutcome::Cancelled);
    assert!(report.final_flow < 100);

    sleep(Duration::from_millis(1200)).await;
    let j = junction(store.as_ref(), 3).await;
    assert_eq!((j.flow, j.status, j.is_manual), (10, FlowStatus::Congested, true));
    assert!(first.active_animations().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clear_from_another_controller_supersedes() {
    let store = Arc::new(InMemoryJunctionStore::new());
    let first = OverrideController::with_defaults(store.clone());
    let second = OverrideController::with_defaults(store.clone());

    let older = first.execute(Command::timed_clear(9)).await.unwrap();
    sleep(Duration::from_millis(1000)).await;
    let newer = second.execute(Command::timed_clear(9)).await.unwrap();
    assert_ne!(older.junction.clear_id, newer.junction.clear_id);

    let older = older.animation.unwrap().wait().await;
    assert_eq!(older.outcome, AnimationOutcome::Cancelled);

    let newer = newer.animation.unwrap().wait().await;
    assert_eq!(newer.outcome, AnimationOutcome::Completed);
    assert_eq!(newer.steps_committed, 50);
    assert_eq!(junction(store.as_ref(), 9).await.flow, 100);
}

#[tokio::test(start_paused = true)]
async fn test_release_from_another_controller_stops_clear() {
    let store = Arc::new(InMemoryJunctionStore::new());
    let first = OverrideController::with_defaults(store.clone());
    let second = OverrideController::with_defaults(store.clone());

    let clear = first.execute(Command::timed_clear(14)).await.unwrap();
    sleep(Duration::from_millis(750)).await;
    let released = second.execute(Command::release_ai(14)).await.unwrap();

    let report = clear.animation.unwrap().wait().await;
    assert_eq!(report.outcome, AnimationOutcome::Cancelled);

    let j = junction(store.as_ref(), 14).await;
    assert!(!j.is_manual);
    assert_eq!(j.clear_id, None);
    assert_eq!(j.flow, released.junction.flow);
}

#[tokio::test(start_paused = true)]
async fn test_conflicting_steps_are_skipped_not_fatal() {
    let store = FlakyStore::new();
    let controller = OverrideController::with_defaults(Arc::new(store.clone()));

    let outcome = controller.execute(Command::timed_clear(3)).await.unwrap();
    sleep(Duration::from_millis(350)).await;
    store.set_contended(true);
    sleep(Duration::from_millis(200)).await;
    store.set_contended(false);

    let report = outcome.animation.unwrap().wait().await;
    assert_eq!(report.outcome, AnimationOutcome::Completed);
    assert_eq!(report.steps_committed, 48, "steps at 400ms and 500ms were skipped");
    assert_eq!(report.final_flow, 100);

    let j = junction(&store, 3).await;
    assert_eq!((j.flow, j.status, j.is_manual), (100, FlowStatus::Clear, true));
}
