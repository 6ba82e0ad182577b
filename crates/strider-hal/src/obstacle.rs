//! Vendor obstacle-avoidance toggle.
//!
//! The on-board avoidance layer rewrites velocity commands on its own, which
//! fights the velocity profile.  It is switched off once at startup; every
//! failure here is logged and otherwise ignored.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::client::StatusCode;

/// Client for the obstacle-avoidance on/off switch.
#[async_trait]
pub trait ObstacleAvoidClient: Send + Sync {
    /// Return whether avoidance is currently enabled.
    async fn switch_get(&self) -> (StatusCode, bool);

    /// Enable or disable avoidance.
    async fn switch_set(&self, enabled: bool) -> StatusCode;
}

/// Switch obstacle avoidance off if it is on, then wait `settle` for the
/// robot to apply it.
///
/// Returns `true` when avoidance is known to be off afterwards.
pub async fn disable_obstacle_avoidance(
    client: &dyn ObstacleAvoidClient,
    settle: Duration,
) -> bool {
    let (code, enabled) = client.switch_get().await;
    if !code.is_ok() {
        error!(code = code.0, "obstacle avoidance switch_get failed");
        return false;
    }
    if !enabled {
        info!("obstacle avoidance is already off");
        return true;
    }

    let code = client.switch_set(false).await;
    if !code.is_ok() {
        error!(code = code.0, "obstacle avoidance switch_set failed");
        return false;
    }
    info!(settle_ms = settle.as_millis() as u64, "obstacle avoidance switched off");
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    true
}
