//! [`TimeoutClient`] – bounds every robot call by a deadline.
//!
//! Vendor clients can block for a long time when the robot link drops.  The
//! wrapper turns an overrun into [`StatusCode::TIMEOUT`] so the caller logs a
//! failed call and keeps ticking.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::client::{RawStateMap, RobotClient, StatusCode};

/// Default per-call deadline.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_millis(500);

/// Wraps a [`RobotClient`] and fails any call that exceeds `timeout`.
pub struct TimeoutClient<C> {
    inner: C,
    timeout: Duration,
}

impl<C: RobotClient> TimeoutClient<C> {
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn bounded<F>(&self, command: &'static str, call: F) -> StatusCode
    where
        F: Future<Output = StatusCode>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(code) => code,
            Err(_) => {
                warn!(
                    command,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "robot call timed out"
                );
                StatusCode::TIMEOUT
            }
        }
    }
}

#[async_trait]
impl<C: RobotClient> RobotClient for TimeoutClient<C> {
    async fn get_state(&self, keys: &[&str]) -> (StatusCode, RawStateMap) {
        match tokio::time::timeout(self.timeout, self.inner.get_state(keys)).await {
            Ok(reply) => reply,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "state query timed out");
                (StatusCode::TIMEOUT, RawStateMap::new())
            }
        }
    }

    async fn move_velocity(&self, vx: f32, vy: f32, vyaw: f32) -> StatusCode {
        self.bounded("move", self.inner.move_velocity(vx, vy, vyaw)).await
    }

    async fn switch_gait(&self, gait_id: i32) -> StatusCode {
        self.bounded("switch_gait", self.inner.switch_gait(gait_id)).await
    }

    async fn stop_move(&self) -> StatusCode {
        self.bounded("stop_move", self.inner.stop_move()).await
    }

    async fn set_body_height(&self, height: f32) -> StatusCode {
        self.bounded("set_body_height", self.inner.set_body_height(height)).await
    }

    async fn set_euler(&self, roll: f32, pitch: f32, yaw: f32) -> StatusCode {
        self.bounded("set_euler", self.inner.set_euler(roll, pitch, yaw)).await
    }

    async fn damp(&self) -> StatusCode {
        self.bounded("damp", self.inner.damp()).await
    }

    async fn balance_stand(&self) -> StatusCode {
        self.bounded("balance_stand", self.inner.balance_stand()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RobotCommand, SimRobotClient};

    /// Never answers.
    struct HungClient;

    #[async_trait]
    impl RobotClient for HungClient {
        async fn get_state(&self, _keys: &[&str]) -> (StatusCode, RawStateMap) {
            std::future::pending().await
        }
        async fn move_velocity(&self, _vx: f32, _vy: f32, _vyaw: f32) -> StatusCode {
            std::future::pending().await
        }
        async fn switch_gait(&self, _gait_id: i32) -> StatusCode {
            std::future::pending().await
        }
        async fn stop_move(&self) -> StatusCode {
            std::future::pending().await
        }
        async fn set_body_height(&self, _height: f32) -> StatusCode {
            std::future::pending().await
        }
        async fn set_euler(&self, _roll: f32, _pitch: f32, _yaw: f32) -> StatusCode {
            std::future::pending().await
        }
        async fn damp(&self) -> StatusCode {
            std::future::pending().await
        }
        async fn balance_stand(&self) -> StatusCode {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn passes_through_fast_calls() {
        let client = TimeoutClient::new(SimRobotClient::new(), DEFAULT_CLIENT_TIMEOUT);
        assert!(client.move_velocity(0.5, 0.0, 0.0).await.is_ok());
        assert_eq!(
            client.inner().commands(),
            vec![RobotCommand::Move { vx: 0.5, vy: 0.0, vyaw: 0.0 }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_reports_timeout() {
        let client = TimeoutClient::new(HungClient, Duration::from_millis(500));
        assert_eq!(client.damp().await, StatusCode::TIMEOUT);
        let (code, map) = client.get_state(&["state"]).await;
        assert_eq!(code, StatusCode::TIMEOUT);
        assert!(map.is_empty());
    }
}
