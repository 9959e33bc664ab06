//! Runtime supervisor.
//!
//! Wires one simulation engine, one override controller and the two viewers
//! onto a single shared store and controls their lifecycle together.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::domain::models::Config;
use crate::domain::ports::JunctionStore;
use crate::services::override_controller::{OverrideConfig, OverrideController};
use crate::services::simulation_engine::{
    EngineHandle, EngineStatus, SimulationConfig, SimulationEngine, SimulationEvent,
};
use crate::services::viewer::{Viewer, ViewerConfig, ViewerHandle, ViewerState};

/// Configured but not yet started runtime.
pub struct TrafficRuntime {
    store: Arc<dyn JunctionStore>,
    simulation: SimulationConfig,
    live_map: ViewerConfig,
    admin: ViewerConfig,
    controller: Arc<OverrideController>,
}

impl TrafficRuntime {
    pub fn new(store: Arc<dyn JunctionStore>, config: &Config) -> Self {
        let controller = Arc::new(OverrideController::new(
            store.clone(),
            OverrideConfig::from(&config.overrides),
        ));
        Self {
            store,
            simulation: SimulationConfig::from(&config.simulation),
            live_map: ViewerConfig::live_map(&config.viewers),
            admin: ViewerConfig::admin(&config.viewers),
            controller,
        }
    }

    pub fn store(&self) -> Arc<dyn JunctionStore> {
        self.store.clone()
    }

    /// The controller shared by the admin surface.
    pub fn controller(&self) -> Arc<OverrideController> {
        self.controller.clone()
    }

    /// Start the engine and both viewers.
    pub fn start(self) -> RuntimeHandle {
        let engine = SimulationEngine::new(self.store.clone(), self.simulation);
        let engine_handle = engine.handle();
        let events = engine.run();

        let live_map = Arc::new(Viewer::new(self.store.clone(), self.live_map));
        let admin = Arc::new(Viewer::new(self.store, self.admin));
        let live_map_rx = live_map.subscribe();
        let admin_rx = admin.subscribe();
        let viewers = vec![live_map.handle(), admin.handle()];
        let viewer_tasks = vec![live_map.run(), admin.run()];

        tracing::info!("traffic runtime started");

        RuntimeHandle {
            engine: engine_handle,
            events,
            controller: self.controller,
            viewers,
            viewer_tasks,
            live_map: live_map_rx,
            admin: admin_rx,
        }
    }
}

/// Control surface of a started runtime.
pub struct RuntimeHandle {
    engine: EngineHandle,
    events: mpsc::Receiver<SimulationEvent>,
    controller: Arc<OverrideController>,
    viewers: Vec<ViewerHandle>,
    viewer_tasks: Vec<JoinHandle<()>>,
    live_map: watch::Receiver<ViewerState>,
    admin: watch::Receiver<ViewerState>,
}

impl RuntimeHandle {
    pub fn controller(&self) -> Arc<OverrideController> {
        self.controller.clone()
    }

    pub fn live_map(&self) -> watch::Receiver<ViewerState> {
        self.live_map.clone()
    }

    pub fn admin(&self) -> watch::Receiver<ViewerState> {
        self.admin.clone()
    }

    /// Simulation events; dropped when not drained.
    pub fn events(&mut self) -> &mut mpsc::Receiver<SimulationEvent> {
        &mut self.events
    }

    pub async fn engine_status(&self) -> EngineStatus {
        self.engine.status().await
    }

    /// Wait for Ctrl-C, or for `duration` when given.
    pub async fn wait_for_shutdown(&self, duration: Option<Duration>) {
        match duration {
            Some(duration) => {
                tokio::select! {
                    () = tokio::time::sleep(duration) => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                }
            }
        }
    }

    /// Stop every schedule and cancel running animations.
    ///
    /// Committed writes stay in the store.
    pub async fn stop(self) {
        self.engine.stop();
        for viewer in &self.viewers {
            viewer.stop();
        }
        self.controller.shutdown().await;

        for result in join_all(self.viewer_tasks).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "viewer task ended abnormally");
            }
        }
        tracing::info!("traffic runtime stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryJunctionStore;

    #[tokio::test(start_paused = true)]
    async fn test_runtime_ticks_and_viewers_poll() {
        let store = Arc::new(InMemoryJunctionStore::new());
        let runtime = TrafficRuntime::new(store.clone(), &Config::default());
        let mut handle = runtime.start();

        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert!(store.version().await >= 3);
        let admin = handle.admin().borrow().clone();
        assert!(admin.polls >= 6);
        assert_eq!(admin.snapshot.len(), 26);
        assert!(matches!(handle.events().recv().await, Some(SimulationEvent::Started)));

        handle.stop().await;
    }
}
