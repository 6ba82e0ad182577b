use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// High-level motion intent delivered by the policy driving the robot.
///
/// Intents are discrete; the postprocessor turns the most recent one into a
/// smooth velocity command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionIntent {
    /// Halt immediately.
    Stop,
    /// Accelerate forward (or brake when moving backward).
    Forward,
    /// Decelerate / accelerate backward.
    Backward,
    /// Turn counter-clockwise.
    Left,
    /// Turn clockwise.
    Right,
    /// No active command; velocities decay toward zero.
    Neutral,
    /// Pitch the body down to inspect the ground in front of the robot.
    LookDown,
}

impl ActionIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionIntent::Stop => "stop",
            ActionIntent::Forward => "forward",
            ActionIntent::Backward => "backward",
            ActionIntent::Left => "left",
            ActionIntent::Right => "right",
            ActionIntent::Neutral => "neutral",
            ActionIntent::LookDown => "look_down",
        }
    }
}

impl fmt::Display for ActionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionIntent {
    type Err = StriderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Ok(ActionIntent::Stop),
            "forward" | "w" => Ok(ActionIntent::Forward),
            "backward" | "s" => Ok(ActionIntent::Backward),
            "left" | "a" => Ok(ActionIntent::Left),
            "right" | "d" => Ok(ActionIntent::Right),
            "neutral" => Ok(ActionIntent::Neutral),
            "look_down" | "lookdown" => Ok(ActionIntent::LookDown),
            other => Err(StriderError::InvalidCommand(format!(
                "unknown action intent '{other}'"
            ))),
        }
    }
}

/// An [`ActionIntent`] stamped with its arrival time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionSample {
    pub intent: ActionIntent,
    pub received_at: Instant,
}

impl ActionSample {
    pub fn new(intent: ActionIntent, received_at: Instant) -> Self {
        Self {
            intent,
            received_at,
        }
    }

    /// The padding sample used by an empty action history: a stop request.
    pub fn idle(at: Instant) -> Self {
        Self::new(ActionIntent::Stop, at)
    }
}

/// One output of the velocity profile.
///
/// `stop` is set either because a stop was requested (explicitly or by the
/// stall guard) or because every axis decayed to exactly zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocitySample {
    /// Forward velocity, m/s.
    pub vx: f32,
    /// Lateral velocity, m/s.
    pub vy: f32,
    /// Yaw rate, rad/s.
    pub vyaw: f32,
    pub stop: bool,
    pub computed_at: Instant,
}

impl VelocitySample {
    /// A stopped sample at the origin.
    pub fn stopped(at: Instant) -> Self {
        Self {
            vx: 0.0,
            vy: 0.0,
            vyaw: 0.0,
            stop: true,
            computed_at: at,
        }
    }
}

impl fmt::Display for VelocitySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Velocity(vx={:.2}, vy={:.2}, vyaw={:.2}, stop={})",
            self.vx, self.vy, self.vyaw, self.stop
        )
    }
}

/// Locomotion gait reported by, and requested from, the robot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gait {
    #[default]
    Idle,
    Walk,
    Run,
    /// A vendor gait this crate does not drive (climb, stairs, ...).
    Other(String),
}

impl Gait {
    /// Numeric identifier accepted by `switch_gait`.
    pub fn id(&self) -> Option<i32> {
        match self {
            Gait::Idle => Some(0),
            Gait::Walk => Some(1),
            Gait::Run => Some(2),
            Gait::Other(_) => None,
        }
    }

    /// Parse either the vendor's gait name or its numeric identifier.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "0" | "idle" => Gait::Idle,
            "1" | "walk" | "trot" => Gait::Walk,
            "2" | "run" | "trot_running" => Gait::Run,
            other => Gait::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Gait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gait::Idle => f.write_str("idle"),
            Gait::Walk => f.write_str("walk"),
            Gait::Run => f.write_str("run"),
            Gait::Other(name) => write!(f, "other({name})"),
        }
    }
}

/// Strongly-typed snapshot of the robot's high-level state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotState {
    /// High-level mode, e.g. `"locomotion"`, `"damping"`, `"balanceStand"`.
    pub state: String,
    pub body_height: f32,
    pub foot_raise_height: f32,
    pub speed_level: i32,
    pub gait: Gait,
    pub joystick: String,
    pub dance: String,
    pub continuous_gait: String,
    pub economic_gait: String,
}

impl RobotState {
    /// `true` when the robot is executing a locomotion primitive.
    pub fn is_locomotion(&self) -> bool {
        self.state == "locomotion"
    }
}

/// Axis names used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Vx,
    Vy,
    Vyaw,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Vx => f.write_str("vx"),
            Axis::Vy => f.write_str("vy"),
            Axis::Vyaw => f.write_str("vyaw"),
        }
    }
}

/// Error type shared by every Strider crate.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StriderError {
    #[error("Robot client call '{command}' failed with status code {code}")]
    Client { command: String, code: i32 },

    #[error("Conflicting command on {axis}: both a delta and an absolute value were supplied")]
    ConflictingAxisCommand { axis: Axis },

    #[error("Unsupported command on {axis}: only decay is implemented for this axis")]
    UnsupportedAxis { axis: Axis },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Failed to decode robot state field '{key}': {details}")]
    StateDecode { key: String, details: String },

    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}
