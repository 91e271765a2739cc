//! Polling synchronizers for the alert, session, and admin views
//!
//! Each target owns one panel of the shared state and refreshes it on a
//! fixed period: one fetch immediately on activation, then one per tick.
//! Fetches within a target are strictly sequential; the loop awaits each
//! fetch before sleeping, so responses cannot complete out of order. A
//! liveness generation captured at activation guards every apply, so a
//! fetch that resolves after deactivation is discarded instead of mutating
//! state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::gateway::ApiGateway;
use crate::state::{current_epoch_ms, Applied, StateHandle};

/// One polled view: activation, periodic refresh, deactivation
#[async_trait]
pub trait PollTarget: Send + Sync {
    /// Target name for logging
    fn name(&self) -> &str;

    /// Fixed refresh period
    fn interval(&self) -> Duration;

    /// Begin a new activation cycle and return its liveness generation
    async fn activate(&self, state: &StateHandle) -> u64;

    /// End the current cycle; in-flight results become stale
    async fn deactivate(&self, state: &StateHandle);

    /// One fetch-and-apply pass under the given generation
    async fn refresh(&self, state: &StateHandle, generation: u64) -> Applied;
}

/// SOS alert list, refreshed every 10 seconds by default
pub struct AlertsPoll {
    gateway: Arc<ApiGateway>,
    interval: Duration,
}

impl AlertsPoll {
    pub fn new(gateway: Arc<ApiGateway>, interval: Duration) -> Self {
        Self { gateway, interval }
    }
}

#[async_trait]
impl PollTarget for AlertsPoll {
    fn name(&self) -> &str {
        "sos-alerts"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn activate(&self, state: &StateHandle) -> u64 {
        state.write().await.alerts.begin_cycle()
    }

    async fn deactivate(&self, state: &StateHandle) {
        state.write().await.alerts.end_cycle();
    }

    async fn refresh(&self, state: &StateHandle, generation: u64) -> Applied {
        let snapshot = match self.gateway.sos_alerts().await {
            Ok(alerts) => Some(alerts),
            Err(e) => {
                tracing::debug!("Failed to fetch alerts: {}", e);
                None
            }
        };
        state
            .write()
            .await
            .alerts
            .apply(generation, snapshot, current_epoch_ms())
    }
}

/// Session list, refreshed every 30 seconds by default
pub struct SessionsPoll {
    gateway: Arc<ApiGateway>,
    interval: Duration,
}

impl SessionsPoll {
    pub fn new(gateway: Arc<ApiGateway>, interval: Duration) -> Self {
        Self { gateway, interval }
    }
}

#[async_trait]
impl PollTarget for SessionsPoll {
    fn name(&self) -> &str {
        "sessions"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn activate(&self, state: &StateHandle) -> u64 {
        state.write().await.sessions.begin_cycle()
    }

    async fn deactivate(&self, state: &StateHandle) {
        state.write().await.sessions.end_cycle();
    }

    async fn refresh(&self, state: &StateHandle, generation: u64) -> Applied {
        let snapshot = match self.gateway.sessions().await {
            Ok(sessions) => Some(sessions),
            Err(e) => {
                tracing::debug!("Failed to fetch sessions: {}", e);
                None
            }
        };
        state
            .write()
            .await
            .sessions
            .apply(generation, snapshot, current_epoch_ms())
    }
}

/// Admin view: alerts and sessions refreshed together every 30 seconds.
/// Unlike the other targets a failed refresh raises a blocking error banner
/// that stays until the next successful refresh.
pub struct AdminPoll {
    gateway: Arc<ApiGateway>,
    interval: Duration,
}

impl AdminPoll {
    pub fn new(gateway: Arc<ApiGateway>, interval: Duration) -> Self {
        Self { gateway, interval }
    }
}

#[async_trait]
impl PollTarget for AdminPoll {
    fn name(&self) -> &str {
        "admin"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn activate(&self, state: &StateHandle) -> u64 {
        state.write().await.admin.begin_cycle()
    }

    async fn deactivate(&self, state: &StateHandle) {
        state.write().await.admin.end_cycle();
    }

    async fn refresh(&self, state: &StateHandle, generation: u64) -> Applied {
        let (alerts, sessions) = tokio::join!(self.gateway.sos_alerts(), self.gateway.sessions());
        let outcome = match (alerts, sessions) {
            (Ok(alerts), Ok(sessions)) => Ok((alerts, sessions)),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Admin refresh failed: {}", e);
                Err(format!("Failed to fetch data: {}", e))
            }
        };
        state.write().await.admin.apply(generation, outcome)
    }
}

/// Drive one target until the cancellation token fires
pub async fn poll_loop(target: Arc<dyn PollTarget>, state: StateHandle, cancel: CancellationToken) {
    let generation = target.activate(&state).await;
    tracing::debug!(
        "Polling '{}' every {:?} (generation {})",
        target.name(),
        target.interval(),
        generation
    );

    loop {
        let applied = target.refresh(&state, generation).await;
        tracing::debug!("Refresh '{}': {:?}", target.name(), applied);

        tokio::select! {
            _ = tokio::time::sleep(target.interval()) => {}
            _ = cancel.cancelled() => {
                tracing::debug!("Polling loop for '{}' cancelled", target.name());
                break;
            }
        }
    }

    target.deactivate(&state).await;
}
