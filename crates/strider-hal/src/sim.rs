//! In-process simulated drivers for headless runs and tests.
//!
//! [`SimRobotClient`] records every command it receives, keeps a plausible
//! [`RobotState`] (gait switches and stops are reflected in later state
//! queries), and can be told to fail specific commands with a chosen
//! [`StatusCode`].  [`SimObstacleAvoid`] models the avoidance switch.
//!
//! # Example
//!
//! ```rust
//! use strider_hal::sim::{RobotCommand, SimRobotClient};
//! use strider_hal::RobotClient;
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let client = SimRobotClient::new();
//! rt.block_on(async {
//!     assert!(client.switch_gait(1).await.is_ok());
//!     assert!(client.move_velocity(0.5, 0.0, 0.1).await.is_ok());
//! });
//! assert_eq!(client.commands().len(), 2);
//! assert!(matches!(client.commands()[1], RobotCommand::Move { .. }));
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use strider_types::{Gait, RobotState};

use crate::client::{RawStateMap, RobotClient, StatusCode};
use crate::obstacle::ObstacleAvoidClient;

/// Status code the simulator returns for an unknown gait identifier.
const UNKNOWN_GAIT_CODE: StatusCode = StatusCode(3203);

// ────────────────────────────────────────────────────────────────────────────
// Recorded commands
// ────────────────────────────────────────────────────────────────────────────

/// A command received by [`SimRobotClient`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RobotCommand {
    Move { vx: f32, vy: f32, vyaw: f32 },
    SwitchGait(i32),
    StopMove,
    BodyHeight(f32),
    Euler { roll: f32, pitch: f32, yaw: f32 },
    Damp,
    BalanceStand,
}

impl RobotCommand {
    /// Name used when injecting failures with [`SimRobotClient::fail`].
    pub fn name(&self) -> &'static str {
        match self {
            RobotCommand::Move { .. } => "move",
            RobotCommand::SwitchGait(_) => "switch_gait",
            RobotCommand::StopMove => "stop_move",
            RobotCommand::BodyHeight(_) => "set_body_height",
            RobotCommand::Euler { .. } => "set_euler",
            RobotCommand::Damp => "damp",
            RobotCommand::BalanceStand => "balance_stand",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated robot client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct SimInner {
    robot: RobotState,
    commands: Vec<RobotCommand>,
    state_queries: usize,
    failures: HashMap<String, StatusCode>,
}

/// A simulated locomotion client.  Every command succeeds unless a failure
/// was injected for it.
pub struct SimRobotClient {
    inner: Mutex<SimInner>,
}

impl Default for SimRobotClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRobotClient {
    /// A robot standing still in the idle gait.
    pub fn new() -> Self {
        Self::with_state(RobotState {
            state: "balanceStand".to_string(),
            gait: Gait::Idle,
            ..RobotState::default()
        })
    }

    /// A robot starting in the given state.
    pub fn with_state(robot: RobotState) -> Self {
        Self {
            inner: Mutex::new(SimInner {
                robot,
                ..SimInner::default()
            }),
        }
    }

    /// Make every subsequent `command` (see [`RobotCommand::name`], plus
    /// `"get_state"`) return `code`.
    pub fn fail(&self, command: &str, code: StatusCode) {
        self.lock().failures.insert(command.to_string(), code);
    }

    /// Remove every injected failure.
    pub fn heal(&self) {
        self.lock().failures.clear();
    }

    /// Commands received so far, oldest first.  State queries are not
    /// recorded here; see [`state_queries`][Self::state_queries].
    pub fn commands(&self) -> Vec<RobotCommand> {
        self.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    /// Number of `get_state` calls received.
    pub fn state_queries(&self) -> usize {
        self.lock().state_queries
    }

    pub fn robot_state(&self) -> RobotState {
        self.lock().robot.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `command`, apply `effect` when it succeeds, and return its code.
    fn apply(&self, command: RobotCommand, effect: impl FnOnce(&mut RobotState)) -> StatusCode {
        let mut inner = self.lock();
        let code = inner
            .failures
            .get(command.name())
            .copied()
            .unwrap_or(StatusCode::OK);
        inner.commands.push(command);
        if code.is_ok() {
            effect(&mut inner.robot);
        }
        code
    }
}

/// Encode a [`RobotState`] the way the vendor client reports it.
pub fn encode_state(robot: &RobotState) -> RawStateMap {
    let gait = match &robot.gait {
        Gait::Other(name) => name.clone(),
        known => known.to_string(),
    };
    let fields = [
        ("state", serde_json::json!(robot.state)),
        ("bodyHeight", serde_json::json!(robot.body_height)),
        ("footRaiseHeight", serde_json::json!(robot.foot_raise_height)),
        ("speedLevel", serde_json::json!(robot.speed_level)),
        ("gait", serde_json::json!(gait)),
        ("joystick", serde_json::json!(robot.joystick)),
        ("dance", serde_json::json!(robot.dance)),
        ("continuousGait", serde_json::json!(robot.continuous_gait)),
        ("economicGait", serde_json::json!(robot.economic_gait)),
    ];
    fields
        .into_iter()
        .map(|(key, data)| (key.to_string(), serde_json::json!({ "data": data }).to_string()))
        .collect()
}

#[async_trait]
impl RobotClient for SimRobotClient {
    async fn get_state(&self, keys: &[&str]) -> (StatusCode, RawStateMap) {
        let mut inner = self.lock();
        inner.state_queries += 1;
        if let Some(code) = inner.failures.get("get_state").copied() {
            return (code, RawStateMap::new());
        }
        let mut raw = encode_state(&inner.robot);
        raw.retain(|k, _| keys.contains(&k.as_str()));
        (StatusCode::OK, raw)
    }

    async fn move_velocity(&self, vx: f32, vy: f32, vyaw: f32) -> StatusCode {
        self.apply(RobotCommand::Move { vx, vy, vyaw }, |robot| {
            robot.state = "locomotion".to_string();
        })
    }

    async fn switch_gait(&self, gait_id: i32) -> StatusCode {
        let gait = match gait_id {
            0 => Gait::Idle,
            1 => Gait::Walk,
            2 => Gait::Run,
            _ => {
                self.lock().commands.push(RobotCommand::SwitchGait(gait_id));
                return UNKNOWN_GAIT_CODE;
            }
        };
        self.apply(RobotCommand::SwitchGait(gait_id), |robot| robot.gait = gait)
    }

    async fn stop_move(&self) -> StatusCode {
        self.apply(RobotCommand::StopMove, |robot| {
            robot.state = "balanceStand".to_string();
        })
    }

    async fn set_body_height(&self, height: f32) -> StatusCode {
        self.apply(RobotCommand::BodyHeight(height), |robot| {
            robot.body_height = height;
        })
    }

    async fn set_euler(&self, roll: f32, pitch: f32, yaw: f32) -> StatusCode {
        self.apply(RobotCommand::Euler { roll, pitch, yaw }, |_| {})
    }

    async fn damp(&self) -> StatusCode {
        self.apply(RobotCommand::Damp, |robot| {
            robot.state = "damping".to_string();
        })
    }

    async fn balance_stand(&self) -> StatusCode {
        self.apply(RobotCommand::BalanceStand, |robot| {
            robot.state = "balanceStand".to_string();
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated obstacle-avoidance switch
// ────────────────────────────────────────────────────────────────────────────

/// A simulated obstacle-avoidance switch.
pub struct SimObstacleAvoid {
    enabled: Mutex<bool>,
    set_calls: Mutex<usize>,
    failure: Option<StatusCode>,
}

impl SimObstacleAvoid {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Mutex::new(enabled),
            set_calls: Mutex::new(0),
            failure: None,
        }
    }

    /// Make every call return `code`.
    pub fn with_failure(mut self, code: StatusCode) -> Self {
        self.failure = Some(code);
        self
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set_calls(&self) -> usize {
        *self.set_calls.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl ObstacleAvoidClient for SimObstacleAvoid {
    async fn switch_get(&self) -> (StatusCode, bool) {
        match self.failure {
            Some(code) => (code, false),
            None => (StatusCode::OK, self.is_enabled()),
        }
    }

    async fn switch_set(&self, enabled: bool) -> StatusCode {
        *self.set_calls.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        if let Some(code) = self.failure {
            return code;
        }
        *self.enabled.lock().unwrap_or_else(|p| p.into_inner()) = enabled;
        StatusCode::OK
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{STATE_KEYS, decode_state};

    #[tokio::test]
    async fn state_roundtrips_through_vendor_encoding() {
        let client = SimRobotClient::new();
        let (code, raw) = client.get_state(&STATE_KEYS).await;
        assert!(code.is_ok());
        let state = decode_state(&raw).unwrap();
        assert_eq!(state, client.robot_state());
        assert_eq!(client.state_queries(), 1);
    }

    #[tokio::test]
    async fn get_state_returns_only_requested_keys() {
        let client = SimRobotClient::new();
        let (_, raw) = client.get_state(&["gait"]).await;
        assert_eq!(raw.len(), 1);
        assert!(raw.contains_key("gait"));
    }

    #[tokio::test]
    async fn switch_gait_updates_reported_gait() {
        let client = SimRobotClient::new();
        assert!(client.switch_gait(1).await.is_ok());
        assert_eq!(client.robot_state().gait, Gait::Walk);
        assert_eq!(client.switch_gait(9).await, UNKNOWN_GAIT_CODE);
        assert_eq!(client.robot_state().gait, Gait::Walk);
    }

    #[tokio::test]
    async fn move_and_stop_update_high_level_state() {
        let client = SimRobotClient::new();
        client.move_velocity(0.3, 0.0, 0.0).await;
        assert!(client.robot_state().is_locomotion());
        client.stop_move().await;
        assert!(!client.robot_state().is_locomotion());
        assert_eq!(
            client.commands(),
            vec![
                RobotCommand::Move {
                    vx: 0.3,
                    vy: 0.0,
                    vyaw: 0.0
                },
                RobotCommand::StopMove
            ]
        );
    }

    #[tokio::test]
    async fn injected_failure_is_recorded_but_not_applied() {
        let client = SimRobotClient::new();
        client.fail("switch_gait", StatusCode(3102));
        assert_eq!(client.switch_gait(1).await, StatusCode(3102));
        assert_eq!(client.robot_state().gait, Gait::Idle);
        assert_eq!(client.commands(), vec![RobotCommand::SwitchGait(1)]);

        client.heal();
        assert!(client.switch_gait(1).await.is_ok());
        assert_eq!(client.robot_state().gait, Gait::Walk);
    }

    #[tokio::test]
    async fn failing_state_query_returns_empty_map() {
        let client = SimRobotClient::new();
        client.fail("get_state", StatusCode(3001));
        let (code, raw) = client.get_state(&STATE_KEYS).await;
        assert_eq!(code, StatusCode(3001));
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn damp_and_balance_stand() {
        let client = SimRobotClient::new();
        client.damp().await;
        assert_eq!(client.robot_state().state, "damping");
        client.balance_stand().await;
        assert_eq!(client.robot_state().state, "balanceStand");
    }
}
