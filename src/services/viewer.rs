//! Polling viewers.
//!
//! A viewer never merges: every poll replaces its whole local state with
//! whatever the store returned, and publishes the new state on a watch
//! channel for renderers.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::DomainResult;
use crate::domain::models::{NetworkSummary, TrafficSnapshot, ViewerSettings};
use crate::domain::ports::JunctionStore;

/// The two views onto the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerKind {
    /// Public live map
    LiveMap,
    /// Restricted admin console
    Admin,
}

impl ViewerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LiveMap => "live-map",
            Self::Admin => "admin",
        }
    }
}

/// Configuration for one viewer.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub kind: ViewerKind,
    pub poll_interval: Duration,
}

impl ViewerConfig {
    pub fn live_map(settings: &ViewerSettings) -> Self {
        Self {
            kind: ViewerKind::LiveMap,
            poll_interval: Duration::from_millis(settings.live_map_poll_ms),
        }
    }

    pub fn admin(settings: &ViewerSettings) -> Self {
        Self {
            kind: ViewerKind::Admin,
            poll_interval: Duration::from_millis(settings.admin_poll_ms),
        }
    }
}

/// Everything a viewer renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub snapshot: TrafficSnapshot,
    /// Store version of `snapshot`; `None` before the first successful poll
    pub version: Option<u64>,
    pub polls: u64,
    pub failed_polls: u64,
    pub polled_at: Option<DateTime<Utc>>,
}

impl ViewerState {
    fn empty() -> Self {
        Self {
            snapshot: TrafficSnapshot::default(),
            version: None,
            polls: 0,
            failed_polls: 0,
            polled_at: None,
        }
    }

    pub fn summary(&self) -> NetworkSummary {
        self.snapshot.summary()
    }
}

/// Handle to stop a running viewer.
#[derive(Clone)]
pub struct ViewerHandle {
    kind: ViewerKind,
    shutdown: CancellationToken,
}

impl ViewerHandle {
    pub fn kind(&self) -> ViewerKind {
        self.kind
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

/// A read-only poller over the shared store.
pub struct Viewer {
    store: Arc<dyn JunctionStore>,
    config: ViewerConfig,
    state: watch::Sender<ViewerState>,
    shutdown: CancellationToken,
}

impl Viewer {
    pub fn new(store: Arc<dyn JunctionStore>, config: ViewerConfig) -> Self {
        let (state, _) = watch::channel(ViewerState::empty());
        Self {
            store,
            config,
            state,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn kind(&self) -> ViewerKind {
        self.config.kind
    }

    pub fn handle(&self) -> ViewerHandle {
        ViewerHandle {
            kind: self.config.kind,
            shutdown: self.shutdown.clone(),
        }
    }

    /// Receive every wholesale state replacement.
    pub fn subscribe(&self) -> watch::Receiver<ViewerState> {
        self.state.subscribe()
    }

    /// The most recent state.
    pub fn latest(&self) -> ViewerState {
        self.state.borrow().clone()
    }

    /// Load the store once and replace the local state with the result.
    ///
    /// On failure the previous state is kept and the failure counted.
    pub async fn poll_once(&self) -> DomainResult<ViewerState> {
        let viewer = self.config.kind.as_str();
        match self.store.load().await {
            Ok(loaded) => {
                let previous_manual = self.state.borrow().summary().manual;
                let next = {
                    let current = self.state.borrow();
                    ViewerState {
                        snapshot: loaded.snapshot,
                        version: Some(loaded.version),
                        polls: current.polls + 1,
                        failed_polls: current.failed_polls,
                        polled_at: Some(Utc::now()),
                    }
                };

                let summary = next.summary();
                if summary.manual != previous_manual {
                    tracing::info!(
                        viewer,
                        version = loaded.version,
                        manual = summary.manual,
                        "viewer observed ownership change"
                    );
                } else {
                    tracing::debug!(viewer, version = loaded.version, "viewer polled");
                }

                self.state.send_replace(next.clone());
                Ok(next)
            }
            Err(e) => {
                self.state.send_modify(|state| state.failed_polls += 1);
                tracing::warn!(viewer, error = %e, "viewer poll failed, keeping previous state");
                Err(e)
            }
        }
    }

    /// Poll on the configured cadence until stopped.
    pub fn run(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval(self.config.poll_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(viewer = self.config.kind.as_str(), poll_interval = ?self.config.poll_interval, "viewer started");

            loop {
                tokio::select! {
                    () = self.shutdown.cancelled() => break,
                    _ = timer.tick() => {
                        // Failures are logged and counted inside; the next poll retries.
                        let _ = self.poll_once().await;
                    }
                }
            }

            tracing::info!(viewer = self.config.kind.as_str(), "viewer stopped");
        })
    }
}
