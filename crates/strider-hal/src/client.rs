//! [`RobotClient`] – the vendor locomotion command surface.
//!
//! Every call returns a numeric [`StatusCode`] where `0` means the command
//! was applied.  The client enforces its own timeout; a call that exceeds it
//! comes back as a non-zero code rather than hanging the caller.
//!
//! State queries return a [`RawStateMap`] whose values are small JSON
//! documents of the form `{"data": <value>}`.  [`decode_state`] turns that
//! map into a validated [`RobotState`].

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use strider_types::{Gait, RobotState, StriderError};

/// Keys requested from [`RobotClient::get_state`] on every refresh.
pub const STATE_KEYS: [&str; 9] = [
    "state",
    "bodyHeight",
    "footRaiseHeight",
    "speedLevel",
    "gait",
    "joystick",
    "dance",
    "continuousGait",
    "economicGait",
];

/// Raw, undecoded state map as returned by the vendor client.
pub type RawStateMap = HashMap<String, String>;

/// Status code returned by every robot client call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0);
    /// Reported when a call overruns its deadline.
    pub const TIMEOUT: StatusCode = StatusCode(-1);

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Convert into a `Result`, naming the failed `command` in the error.
    pub fn into_result(self, command: &str) -> Result<(), StriderError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(StriderError::Client {
                command: command.to_string(),
                code: self.0,
            })
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locomotion command client for a legged robot.
///
/// Implementations must be shareable: the postprocessor loop and the
/// controller handler hold the same client.
#[async_trait]
pub trait RobotClient: Send + Sync {
    /// Query the given state `keys`.  The map is only meaningful when the
    /// returned code is [`StatusCode::OK`].
    async fn get_state(&self, keys: &[&str]) -> (StatusCode, RawStateMap);

    /// Command body velocities (m/s, m/s, rad/s) in the current gait.
    async fn move_velocity(&self, vx: f32, vy: f32, vyaw: f32) -> StatusCode;

    /// Switch the locomotion gait by numeric identifier.
    async fn switch_gait(&self, gait_id: i32) -> StatusCode;

    /// Halt locomotion and hold the current stance.
    async fn stop_move(&self) -> StatusCode;

    /// Offset the body height from its nominal value, metres.
    async fn set_body_height(&self, height: f32) -> StatusCode;

    /// Set body roll / pitch / yaw, radians.
    async fn set_euler(&self, roll: f32, pitch: f32, yaw: f32) -> StatusCode;

    /// Cut joint torque and let the robot settle passively.
    async fn damp(&self) -> StatusCode;

    /// Return to a balanced stand.
    async fn balance_stand(&self) -> StatusCode;
}

/// Decode a vendor state map into a [`RobotState`].
///
/// `state` and `gait` are required; the remaining fields fall back to their
/// defaults when absent but must be well-formed when present.
///
/// # Errors
///
/// Returns [`StriderError::StateDecode`] when a required key is missing or a
/// value is not a `{"data": ...}` document of the expected type.
pub fn decode_state(raw: &RawStateMap) -> Result<RobotState, StriderError> {
    let mut state = RobotState {
        state: required(raw, "state").and_then(|v| as_string("state", &v))?,
        gait: required(raw, "gait").map(|v| gait_from(&v))?,
        ..RobotState::default()
    };

    if let Some(v) = optional(raw, "bodyHeight")? {
        state.body_height = as_f32("bodyHeight", &v)?;
    }
    if let Some(v) = optional(raw, "footRaiseHeight")? {
        state.foot_raise_height = as_f32("footRaiseHeight", &v)?;
    }
    if let Some(v) = optional(raw, "speedLevel")? {
        state.speed_level = v
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| decode_err("speedLevel", "expected an integer"))?;
    }
    if let Some(v) = optional(raw, "joystick")? {
        state.joystick = as_string("joystick", &v)?;
    }
    if let Some(v) = optional(raw, "dance")? {
        state.dance = as_string("dance", &v)?;
    }
    if let Some(v) = optional(raw, "continuousGait")? {
        state.continuous_gait = as_string("continuousGait", &v)?;
    }
    if let Some(v) = optional(raw, "economicGait")? {
        state.economic_gait = as_string("economicGait", &v)?;
    }

    Ok(state)
}

fn required(raw: &RawStateMap, key: &str) -> Result<Value, StriderError> {
    optional(raw, key)?.ok_or_else(|| decode_err(key, "missing"))
}

fn optional(raw: &RawStateMap, key: &str) -> Result<Option<Value>, StriderError> {
    let Some(text) = raw.get(key) else {
        return Ok(None);
    };
    let doc: Value =
        serde_json::from_str(text).map_err(|e| decode_err(key, &format!("invalid JSON: {e}")))?;
    match doc.get("data") {
        Some(data) => Ok(Some(data.clone())),
        None => Err(decode_err(key, "missing 'data' field")),
    }
}

fn as_string(key: &str, v: &Value) -> Result<String, StriderError> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(decode_err(key, "expected a scalar")),
    }
}

fn as_f32(key: &str, v: &Value) -> Result<f32, StriderError> {
    v.as_f64()
        .map(|n| n as f32)
        .ok_or_else(|| decode_err(key, "expected a number"))
}

fn gait_from(v: &Value) -> Gait {
    match v {
        Value::String(s) => Gait::parse(s),
        other => Gait::parse(&other.to_string()),
    }
}

fn decode_err(key: &str, details: &str) -> StriderError {
    StriderError::StateDecode {
        key: key.to_string(),
        details: details.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawStateMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn status_code_ok_and_error() {
        assert!(StatusCode::OK.is_ok());
        assert!(StatusCode::OK.into_result("move").is_ok());
        let err = StatusCode(3102).into_result("switch_gait").unwrap_err();
        assert_eq!(
            err,
            StriderError::Client {
                command: "switch_gait".to_string(),
                code: 3102
            }
        );
    }

    #[test]
    fn decode_full_state() {
        let map = raw(&[
            ("state", r#"{"data": "locomotion"}"#),
            ("bodyHeight", r#"{"data": 0.32}"#),
            ("footRaiseHeight", r#"{"data": 0.09}"#),
            ("speedLevel", r#"{"data": 1}"#),
            ("gait", r#"{"data": "walk"}"#),
            ("joystick", r#"{"data": "normal"}"#),
            ("dance", r#"{"data": "none"}"#),
            ("continuousGait", r#"{"data": false}"#),
            ("economicGait", r#"{"data": "none"}"#),
        ]);
        let state = decode_state(&map).unwrap();
        assert!(state.is_locomotion());
        assert_eq!(state.gait, Gait::Walk);
        assert!((state.body_height - 0.32).abs() < 1e-6);
        assert_eq!(state.speed_level, 1);
        assert_eq!(state.continuous_gait, "false");
    }

    #[test]
    fn decode_numeric_gait() {
        let map = raw(&[
            ("state", r#"{"data": "balanceStand"}"#),
            ("gait", r#"{"data": 2}"#),
        ]);
        let state = decode_state(&map).unwrap();
        assert_eq!(state.gait, Gait::Run);
        assert_eq!(state.body_height, 0.0);
    }

    #[test]
    fn decode_missing_required_key_fails() {
        let map = raw(&[("state", r#"{"data": "locomotion"}"#)]);
        let err = decode_state(&map).unwrap_err();
        assert!(matches!(err, StriderError::StateDecode { key, .. } if key == "gait"));
    }

    #[test]
    fn decode_malformed_value_fails() {
        let map = raw(&[
            ("state", r#"{"data": "locomotion"}"#),
            ("gait", r#"{"data": "walk"}"#),
            ("bodyHeight", r#"{"data": "tall"}"#),
        ]);
        assert!(matches!(
            decode_state(&map),
            Err(StriderError::StateDecode { key, .. }) if key == "bodyHeight"
        ));

        let map = raw(&[("state", "not json"), ("gait", r#"{"data": "walk"}"#)]);
        assert!(decode_state(&map).is_err());

        let map = raw(&[("state", r#"{"value": 1}"#), ("gait", r#"{"data": "walk"}"#)]);
        assert!(decode_state(&map).is_err());
    }
}
