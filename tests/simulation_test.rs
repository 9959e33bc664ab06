//! Simulation engine behaviour against the shared store.

mod common;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

use common::FlakyStore;
use traffic_sync::adapters::memory::InMemoryJunctionStore;
use traffic_sync::domain::models::{seed_snapshot, FlowStatus, Junction, TrafficSnapshot};
use traffic_sync::services::{advance_snapshot, SimulationConfig, SimulationEngine, SimulationEvent};
use traffic_sync::{DomainError, JunctionStore};

fn network(flows: &[u8], manual: &[bool]) -> TrafficSnapshot {
    TrafficSnapshot::new(
        flows
            .iter()
            .zip(manual)
            .enumerate()
            .map(|(i, (&flow, &is_manual))| {
                let mut junction = Junction::new(u32::try_from(i).unwrap() + 1, format!("J{i}"), (0.0, 0.0), flow);
                if is_manual {
                    junction.block();
                }
                junction
            })
            .collect(),
    )
}

proptest! {
    #[test]
    fn flow_stays_in_range_and_status_follows_flow(
        flows in prop::collection::vec(0u8..=100, 1..40),
        seed in any::<u64>(),
        ticks in 1usize..60,
    ) {
        let manual = vec![false; flows.len()];
        let mut snapshot = network(&flows, &manual);
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..ticks {
            advance_snapshot(&mut snapshot, &mut rng, -5, 4);
            for junction in &snapshot.junctions {
                prop_assert!(junction.flow <= 100);
                prop_assert_eq!(junction.status, FlowStatus::from_flow(junction.flow));
            }
        }
    }

    #[test]
    fn manual_junctions_never_move(
        flows in prop::collection::vec(0u8..=100, 1..30),
        manual in prop::collection::vec(any::<bool>(), 30),
        seed in any::<u64>(),
    ) {
        let manual = &manual[..flows.len()];
        let mut snapshot = network(&flows, manual);
        let before = snapshot.clone();
        let mut rng = StdRng::seed_from_u64(seed);

        let counts = advance_snapshot(&mut snapshot, &mut rng, -5, 4);
        prop_assert_eq!(counts.manual_skipped, manual.iter().filter(|m| **m).count());

        for (after, before) in snapshot.junctions.iter().zip(&before.junctions) {
            if before.is_manual {
                prop_assert_eq!(after, before);
            } else {
                let moved = i32::from(after.flow) - i32::from(before.flow);
                prop_assert!((-5..=4).contains(&moved));
            }
        }
    }
}

#[test]
fn test_status_thresholds() {
    assert_eq!(FlowStatus::from_flow(29), FlowStatus::Congested);
    assert_eq!(FlowStatus::from_flow(30), FlowStatus::Moderate);
    assert_eq!(FlowStatus::from_flow(59), FlowStatus::Moderate);
    assert_eq!(FlowStatus::from_flow(60), FlowStatus::Clear);
}

#[test]
fn test_flow_clamps_at_bounds() {
    let mut snapshot = network(&[0, 100], &[false, false]);
    // Every draw from a degenerate range is the bound itself.
    advance_snapshot(&mut snapshot, &mut StdRng::seed_from_u64(0), 4, 4);
    assert_eq!(snapshot.junctions[0].flow, 4);
    assert_eq!(snapshot.junctions[1].flow, 100);
    advance_snapshot(&mut snapshot, &mut StdRng::seed_from_u64(0), -5, -5);
    assert_eq!(snapshot.junctions[0].flow, 0);
    assert_eq!(snapshot.junctions[1].flow, 95);
}

#[tokio::test]
async fn test_tick_preserves_manual_junction() {
    let store = Arc::new(InMemoryJunctionStore::new());
    let mut seeded = seed_snapshot();
    seeded.junctions[2].block();
    store.save(&seeded, 0).await.unwrap();

    let engine = SimulationEngine::new(store.clone(), SimulationConfig::default());
    for _ in 0..10 {
        engine.tick().await.unwrap();
    }

    let junction = common::junction(store.as_ref(), 3).await;
    assert!(junction.is_manual);
    assert_eq!(junction.flow, 10);
    assert_eq!(junction.status, FlowStatus::Congested);
    assert_eq!(store.version().await, 11);
}

#[tokio::test]
async fn test_outage_skips_tick_then_recovers() {
    let store = FlakyStore::new();
    let engine = SimulationEngine::new(Arc::new(store.clone()), SimulationConfig::default());

    engine.tick().await.unwrap();
    store.set_down(true);
    let err = engine.tick().await.unwrap_err();
    assert!(matches!(err, DomainError::StoreUnavailable(_)));

    store.set_down(false);
    let report = engine.tick().await.unwrap();
    assert_eq!(report.tick_number, 3);
    assert_eq!(report.version, 2);

    let status = engine.status().await;
    assert_eq!(status.completed_ticks, 2);
    assert_eq!(status.skipped_ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_running_engine_survives_outage() {
    let store = FlakyStore::new();
    let engine = SimulationEngine::new(Arc::new(store.clone()), SimulationConfig::with_interval(Duration::from_secs(1)));
    let handle = engine.handle();
    let mut events = engine.run();

    assert!(matches!(events.recv().await, Some(SimulationEvent::Started)));
    assert!(matches!(events.recv().await, Some(SimulationEvent::TickCompleted { .. })));

    store.set_down(true);
    assert!(matches!(events.recv().await, Some(SimulationEvent::TickSkipped { .. })));

    store.set_down(false);
    match events.recv().await {
        Some(SimulationEvent::TickCompleted { report }) => {
            assert_eq!(report.tick_number, 3);
            assert_eq!(report.version, 2);
        }
        other => panic!("expected a committed tick, got {other:?}"),
    }

    handle.stop();
    loop {
        match events.recv().await {
            Some(SimulationEvent::Stopped) | None => break,
            Some(_) => {}
        }
    }
    assert!(!handle.status().await.running);
    assert_eq!(store.inner().version().await, 2);
}

#[tokio::test]
async fn test_seeded_engine_is_reproducible() {
    let config = SimulationConfig {
        seed: Some(1234),
        ..Default::default()
    };
    let a = Arc::new(InMemoryJunctionStore::new());
    let b = Arc::new(InMemoryJunctionStore::new());
    let engine_a = SimulationEngine::new(a.clone(), config.clone());
    let engine_b = SimulationEngine::new(b.clone(), config);

    for _ in 0..5 {
        engine_a.tick().await.unwrap();
        engine_b.tick().await.unwrap();
    }

    assert_eq!(a.load().await.unwrap().snapshot, b.load().await.unwrap().snapshot);
}
