//! [`VelocityProfile`] – rate-limited body velocity integrator.
//!
//! Every call to [`VelocityProfile::update`] advances the three body
//! velocities (`vx`, `vy`, `vyaw`) by the time elapsed since the previous
//! call:
//!
//! 1. A gap longer than the stall timeout forces a stop.  A caller that
//!    stops calling looks the same as a caller requesting a stop.
//! 2. A stop snaps every axis to zero.
//! 3. Otherwise each axis integrates its [`AxisCommand::Delta`] rate or takes
//!    its [`AxisCommand::Absolute`] value.
//! 4. Axes left at [`AxisCommand::Decay`] move toward zero at their decrease
//!    rate and snap to zero inside the deadzone band.
//! 5. Every axis is clamped to its `[min, max]` envelope.
//! 6. A profile resting at the origin reports `stop = true`.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use strider_runtime::velocity_profile::{ProfileConfig, VelocityCommand, VelocityProfile};
//!
//! let t0 = Instant::now();
//! let mut profile = VelocityProfile::new_at(ProfileConfig::default(), t0);
//! let sample = profile
//!     .update_at(&VelocityCommand::delta(1.0, 0.0), t0 + Duration::from_millis(100))
//!     .unwrap();
//! assert!((sample.vx - 0.1).abs() < 1e-6);
//! assert!(!sample.stop);
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strider_types::{Axis, StriderError, VelocitySample};
use tracing::{debug, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Rates (units/s²), deadzones and envelopes for a [`VelocityProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Decay rate applied while `vx` is positive.
    #[serde(default = "default_vx_decrease_rate")]
    pub vx_decrease_rate_positive: f32,
    /// Decay rate applied while `vx` is negative.
    #[serde(default = "default_vx_decrease_rate")]
    pub vx_decrease_rate_negative: f32,
    #[serde(default = "default_vy_decrease_rate")]
    pub vy_decrease_rate: f32,
    #[serde(default = "default_vyaw_decrease_rate")]
    pub vyaw_decrease_rate: f32,

    #[serde(default = "default_deadzone_vx")]
    pub deadzone_vx: f32,
    #[serde(default = "default_deadzone_vy")]
    pub deadzone_vy: f32,
    #[serde(default = "default_deadzone_vyaw")]
    pub deadzone_vyaw: f32,

    #[serde(default = "default_vx_min")]
    pub vx_min: f32,
    #[serde(default = "default_vx_max")]
    pub vx_max: f32,
    #[serde(default = "default_vy_min")]
    pub vy_min: f32,
    #[serde(default = "default_vy_max")]
    pub vy_max: f32,
    #[serde(default = "default_vyaw_min")]
    pub vyaw_min: f32,
    #[serde(default = "default_vyaw_max")]
    pub vyaw_max: f32,

    /// Longest accepted gap between two updates, in milliseconds.
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,
}

fn default_vx_decrease_rate() -> f32 {
    1.0
}
fn default_vy_decrease_rate() -> f32 {
    1.0
}
fn default_vyaw_decrease_rate() -> f32 {
    2.0
}
fn default_deadzone_vx() -> f32 {
    0.1
}
fn default_deadzone_vy() -> f32 {
    0.1
}
fn default_deadzone_vyaw() -> f32 {
    0.001
}
fn default_vx_min() -> f32 {
    0.0
}
fn default_vx_max() -> f32 {
    2.0
}
fn default_vy_min() -> f32 {
    -2.5
}
fn default_vy_max() -> f32 {
    5.0
}
fn default_vyaw_min() -> f32 {
    -4.0
}
fn default_vyaw_max() -> f32 {
    4.0
}
fn default_stall_timeout_ms() -> u64 {
    200
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            vx_decrease_rate_positive: default_vx_decrease_rate(),
            vx_decrease_rate_negative: default_vx_decrease_rate(),
            vy_decrease_rate: default_vy_decrease_rate(),
            vyaw_decrease_rate: default_vyaw_decrease_rate(),
            deadzone_vx: default_deadzone_vx(),
            deadzone_vy: default_deadzone_vy(),
            deadzone_vyaw: default_deadzone_vyaw(),
            vx_min: default_vx_min(),
            vx_max: default_vx_max(),
            vy_min: default_vy_min(),
            vy_max: default_vy_max(),
            vyaw_min: default_vyaw_min(),
            vyaw_max: default_vyaw_max(),
            stall_timeout_ms: default_stall_timeout_ms(),
        }
    }
}

impl ProfileConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    /// Check that every envelope is non-empty and every rate and deadzone is
    /// a finite, non-negative number.
    ///
    /// # Errors
    ///
    /// Returns [`StriderError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), StriderError> {
        let non_negative = [
            ("vx_decrease_rate_positive", self.vx_decrease_rate_positive),
            ("vx_decrease_rate_negative", self.vx_decrease_rate_negative),
            ("vy_decrease_rate", self.vy_decrease_rate),
            ("vyaw_decrease_rate", self.vyaw_decrease_rate),
            ("deadzone_vx", self.deadzone_vx),
            ("deadzone_vy", self.deadzone_vy),
            ("deadzone_vyaw", self.deadzone_vyaw),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(StriderError::Config(format!(
                    "profile.{name} must be a non-negative number, got {value}"
                )));
            }
        }

        let envelopes = [
            (Axis::Vx, self.vx_min, self.vx_max),
            (Axis::Vy, self.vy_min, self.vy_max),
            (Axis::Vyaw, self.vyaw_min, self.vyaw_max),
        ];
        for (axis, min, max) in envelopes {
            if !min.is_finite() || !max.is_finite() || min > max {
                return Err(StriderError::Config(format!(
                    "profile.{axis} envelope [{min}, {max}] is empty"
                )));
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// What to do with one axis during an update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AxisCommand {
    /// No active command: decay toward zero.
    #[default]
    Decay,
    /// Integrate this rate (units/s²) over the elapsed time.
    Delta(f32),
    /// Jump straight to this value.
    Absolute(f32),
}

impl AxisCommand {
    fn value(self) -> Option<f32> {
        match self {
            AxisCommand::Decay => None,
            AxisCommand::Delta(v) | AxisCommand::Absolute(v) => Some(v),
        }
    }
}

/// Input to one [`VelocityProfile::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    pub vx: AxisCommand,
    pub vy: AxisCommand,
    pub vyaw: AxisCommand,
    /// Snap every axis to zero.  Overrides the per-axis commands.
    pub stop: bool,
}

impl VelocityCommand {
    /// Let every axis decay.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn stop() -> Self {
        Self {
            stop: true,
            ..Self::default()
        }
    }

    /// Accelerate `vx` and `vyaw` at the given rates; `vy` decays.
    pub fn delta(dvx: f32, dvyaw: f32) -> Self {
        Self {
            vx: AxisCommand::Delta(dvx),
            vyaw: AxisCommand::Delta(dvyaw),
            ..Self::default()
        }
    }

    /// Accelerate `vx` only.
    pub fn vx_delta(rate: f32) -> Self {
        Self {
            vx: AxisCommand::Delta(rate),
            ..Self::default()
        }
    }

    /// Accelerate `vyaw` only.
    pub fn vyaw_delta(rate: f32) -> Self {
        Self {
            vyaw: AxisCommand::Delta(rate),
            ..Self::default()
        }
    }

    /// Set every axis directly.
    pub fn absolute(vx: f32, vy: f32, vyaw: f32) -> Self {
        Self {
            vx: AxisCommand::Absolute(vx),
            vy: AxisCommand::Absolute(vy),
            vyaw: AxisCommand::Absolute(vyaw),
            stop: false,
        }
    }

    /// Build a command from optional per-axis deltas and absolute values.
    ///
    /// # Errors
    ///
    /// Returns [`StriderError::ConflictingAxisCommand`] when an axis is given
    /// both a delta and an absolute value.
    pub fn from_parts(
        dvx: Option<f32>,
        dvy: Option<f32>,
        dvyaw: Option<f32>,
        vx: Option<f32>,
        vy: Option<f32>,
        vyaw: Option<f32>,
        stop: bool,
    ) -> Result<Self, StriderError> {
        Ok(Self {
            vx: axis_from_parts(Axis::Vx, dvx, vx)?,
            vy: axis_from_parts(Axis::Vy, dvy, vy)?,
            vyaw: axis_from_parts(Axis::Vyaw, dvyaw, vyaw)?,
            stop,
        })
    }

    /// Reject commands the profile cannot execute.
    ///
    /// # Errors
    ///
    /// - [`StriderError::UnsupportedAxis`] for a `vy` delta: lateral
    ///   acceleration has no configured rate.
    /// - [`StriderError::InvalidCommand`] for NaN or infinite values.
    pub fn validate(&self) -> Result<(), StriderError> {
        if matches!(self.vy, AxisCommand::Delta(_)) {
            return Err(StriderError::UnsupportedAxis { axis: Axis::Vy });
        }
        for (axis, cmd) in [(Axis::Vx, self.vx), (Axis::Vy, self.vy), (Axis::Vyaw, self.vyaw)] {
            match cmd.value() {
                Some(v) if !v.is_finite() => {
                    return Err(StriderError::InvalidCommand(format!(
                        "{axis} command is not finite: {v}"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn axis_from_parts(
    axis: Axis,
    delta: Option<f32>,
    absolute: Option<f32>,
) -> Result<AxisCommand, StriderError> {
    match (delta, absolute) {
        (Some(_), Some(_)) => Err(StriderError::ConflictingAxisCommand { axis }),
        (Some(rate), None) => Ok(AxisCommand::Delta(rate)),
        (None, Some(value)) => Ok(AxisCommand::Absolute(value)),
        (None, None) => Ok(AxisCommand::Decay),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// VelocityProfile
// ─────────────────────────────────────────────────────────────────────────────

/// Integrates velocity commands into a smooth, bounded velocity stream.
#[derive(Debug, Clone)]
pub struct VelocityProfile {
    config: ProfileConfig,
    vx: f32,
    vy: f32,
    vyaw: f32,
    last_update_at: Instant,
}

impl VelocityProfile {
    /// Create a profile at rest, timed from now.
    pub fn new(config: ProfileConfig) -> Self {
        Self::new_at(config, Instant::now())
    }

    /// Create a profile at rest whose first update is timed from `created_at`.
    pub fn new_at(config: ProfileConfig, created_at: Instant) -> Self {
        Self {
            config,
            vx: 0.0,
            vy: 0.0,
            vyaw: 0.0,
            last_update_at: created_at,
        }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    pub fn vx(&self) -> f32 {
        self.vx
    }

    pub fn vy(&self) -> f32 {
        self.vy
    }

    pub fn vyaw(&self) -> f32 {
        self.vyaw
    }

    pub fn last_update_at(&self) -> Instant {
        self.last_update_at
    }

    /// Advance the profile to now.
    ///
    /// # Errors
    ///
    /// See [`VelocityCommand::validate`].  The profile is left untouched on
    /// error.
    pub fn update(&mut self, command: &VelocityCommand) -> Result<VelocitySample, StriderError> {
        self.update_at(command, Instant::now())
    }

    /// Advance the profile to `now`.
    ///
    /// # Errors
    ///
    /// See [`VelocityCommand::validate`].  The profile is left untouched on
    /// error.
    pub fn update_at(
        &mut self,
        command: &VelocityCommand,
        now: Instant,
    ) -> Result<VelocitySample, StriderError> {
        command.validate()?;

        let elapsed = now.saturating_duration_since(self.last_update_at);
        let dt = elapsed.as_secs_f32();
        let mut stop = command.stop;
        if elapsed > self.config.stall_timeout() {
            warn!(dt, "velocity profile stalled; forcing stop");
            stop = true;
        }

        if stop {
            self.vx = 0.0;
            self.vy = 0.0;
            self.vyaw = 0.0;
        } else {
            self.vx = integrate(self.vx, command.vx, dt);
            self.vy = integrate(self.vy, command.vy, dt);
            self.vyaw = integrate(self.vyaw, command.vyaw, dt);
        }

        let c = &self.config;
        if command.vx == AxisCommand::Decay {
            self.vx = decay(
                self.vx,
                c.deadzone_vx,
                c.vx_decrease_rate_positive,
                c.vx_decrease_rate_negative,
                dt,
            );
        }
        if command.vy == AxisCommand::Decay {
            self.vy = decay(self.vy, c.deadzone_vy, c.vy_decrease_rate, c.vy_decrease_rate, dt);
        }
        if command.vyaw == AxisCommand::Decay {
            self.vyaw = decay(
                self.vyaw,
                c.deadzone_vyaw,
                c.vyaw_decrease_rate,
                c.vyaw_decrease_rate,
                dt,
            );
        }

        self.vx = clamp(self.vx, c.vx_min, c.vx_max);
        self.vy = clamp(self.vy, c.vy_min, c.vy_max);
        self.vyaw = clamp(self.vyaw, c.vyaw_min, c.vyaw_max);

        let stop = stop || (self.vx == 0.0 && self.vy == 0.0 && self.vyaw == 0.0);
        self.last_update_at = now;

        let sample = VelocitySample {
            vx: self.vx,
            vy: self.vy,
            vyaw: self.vyaw,
            stop,
            computed_at: now,
        };
        debug!(%sample, "velocity profile updated");
        Ok(sample)
    }

    /// Bring every axis to rest and restart the clock at `now`.
    pub fn reset_at(&mut self, now: Instant) {
        self.vx = 0.0;
        self.vy = 0.0;
        self.vyaw = 0.0;
        self.last_update_at = now;
    }
}

fn integrate(value: f32, command: AxisCommand, dt: f32) -> f32 {
    match command {
        AxisCommand::Decay => value,
        AxisCommand::Delta(rate) => value + rate * dt,
        AxisCommand::Absolute(target) => target,
    }
}

fn decay(value: f32, deadzone: f32, rate_positive: f32, rate_negative: f32, dt: f32) -> f32 {
    if value > deadzone {
        (value - rate_positive * dt).max(0.0)
    } else if value < -deadzone {
        (value + rate_negative * dt).min(0.0)
    } else {
        0.0
    }
}

// `f32::clamp` panics on an inverted envelope.
fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.min(max).max(min)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn wide_config() -> ProfileConfig {
        ProfileConfig {
            vx_min: -2.0,
            stall_timeout_ms: 5_000,
            ..ProfileConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ProfileConfig::default().validate().is_ok());
        let bad = ProfileConfig {
            vx_min: 3.0,
            ..ProfileConfig::default()
        };
        assert!(matches!(bad.validate(), Err(StriderError::Config(_))));
        let bad = ProfileConfig {
            deadzone_vy: f32::NAN,
            ..ProfileConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn repeated_stop_stays_at_origin() {
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(ProfileConfig::default(), t0);
        p.update_at(&VelocityCommand::absolute(1.0, 0.5, 0.3), t0 + ms(20))
            .unwrap();
        for i in 2..10 {
            let s = p.update_at(&VelocityCommand::stop(), t0 + ms(20 * i)).unwrap();
            assert_eq!((s.vx, s.vy, s.vyaw), (0.0, 0.0, 0.0));
            assert!(s.stop);
        }
    }

    #[test]
    fn stop_wins_over_axis_commands() {
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(ProfileConfig::default(), t0);
        let cmd = VelocityCommand {
            stop: true,
            ..VelocityCommand::absolute(1.0, 1.0, 1.0)
        };
        let s = p.update_at(&cmd, t0 + ms(20)).unwrap();
        assert!(s.stop);
        assert_eq!(s.vx, 0.0);
    }

    #[test]
    fn every_axis_is_clamped() {
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(ProfileConfig::default(), t0);
        let s = p
            .update_at(&VelocityCommand::absolute(10.0, -10.0, 10.0), t0 + ms(20))
            .unwrap();
        assert_eq!((s.vx, s.vy, s.vyaw), (2.0, -2.5, 4.0));
        let s = p
            .update_at(&VelocityCommand::absolute(-10.0, 10.0, -10.0), t0 + ms(40))
            .unwrap();
        assert_eq!((s.vx, s.vy, s.vyaw), (0.0, 5.0, -4.0));

        let mut p = VelocityProfile::new_at(ProfileConfig::default(), t0);
        for i in 1..=200 {
            let s = p
                .update_at(&VelocityCommand::delta(50.0, -50.0), t0 + ms(10 * i))
                .unwrap();
            assert!((0.0..=2.0).contains(&s.vx));
            assert!((-4.0..=4.0).contains(&s.vyaw));
        }
    }

    #[test]
    fn decay_is_monotonic_without_overshoot() {
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(wide_config(), t0);
        p.update_at(&VelocityCommand::absolute(1.5, 0.0, 0.0), t0).unwrap();
        let mut previous = p.vx().abs();
        let mut t = t0;
        for _ in 0..200 {
            t += ms(20);
            let s = p.update_at(&VelocityCommand::idle(), t).unwrap();
            assert!(s.vx >= 0.0);
            assert!(s.vx.abs() <= previous);
            previous = s.vx.abs();
        }
        assert_eq!(p.vx(), 0.0);

        // Same from below.
        p.update_at(&VelocityCommand::absolute(-1.5, 0.0, 0.0), t).unwrap();
        let mut previous = p.vx().abs();
        for _ in 0..200 {
            t += ms(20);
            let s = p.update_at(&VelocityCommand::idle(), t).unwrap();
            assert!(s.vx <= 0.0);
            assert!(s.vx.abs() <= previous);
            previous = s.vx.abs();
        }
        assert_eq!(p.vx(), 0.0);
    }

    #[test]
    fn deadzone_snaps_to_zero() {
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(wide_config(), t0);
        p.update_at(&VelocityCommand::absolute(0.09, -0.05, 0.0005), t0).unwrap();
        let s = p.update_at(&VelocityCommand::idle(), t0 + ms(1)).unwrap();
        assert_eq!((s.vx, s.vy, s.vyaw), (0.0, 0.0, 0.0));
        assert!(s.stop);
    }

    #[test]
    fn asymmetric_vx_decay_rates() {
        let config = ProfileConfig {
            vx_decrease_rate_positive: 1.0,
            vx_decrease_rate_negative: 2.0,
            ..wide_config()
        };
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(config, t0);
        p.update_at(&VelocityCommand::absolute(1.0, 0.0, 0.0), t0).unwrap();
        let s = p.update_at(&VelocityCommand::idle(), t0 + ms(100)).unwrap();
        assert!((s.vx - 0.9).abs() < 1e-5);

        p.update_at(&VelocityCommand::absolute(-1.0, 0.0, 0.0), t0 + ms(100))
            .unwrap();
        let s = p.update_at(&VelocityCommand::idle(), t0 + ms(200)).unwrap();
        assert!((s.vx + 0.8).abs() < 1e-5);
    }

    #[test]
    fn stall_forces_stop() {
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(ProfileConfig::default(), t0);
        p.update_at(&VelocityCommand::absolute(1.0, 0.0, 1.0), t0 + ms(20))
            .unwrap();
        let s = p
            .update_at(&VelocityCommand::absolute(1.0, 0.0, 1.0), t0 + ms(250))
            .unwrap();
        assert!(s.stop);
        assert_eq!((s.vx, s.vyaw), (0.0, 0.0));
    }

    #[test]
    fn first_update_is_timed_from_construction() {
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(ProfileConfig::default(), t0);
        let s = p.update_at(&VelocityCommand::delta(1.0, 0.0), t0 + ms(20)).unwrap();
        assert!(!s.stop);
        assert!((s.vx - 0.02).abs() < 1e-6);
    }

    #[test]
    fn delta_then_decay_scenario() {
        let config = ProfileConfig {
            vx_max: 2.0,
            deadzone_vx: 0.1,
            vx_decrease_rate_positive: 1.0,
            stall_timeout_ms: 2_000,
            ..ProfileConfig::default()
        };
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(config, t0);

        let s = p.update_at(&VelocityCommand::delta(1.0, 0.0), t0 + ms(500)).unwrap();
        assert!((s.vx - 0.5).abs() < 1e-6);
        assert!(!s.stop);

        let s = p.update_at(&VelocityCommand::idle(), t0 + ms(1500)).unwrap();
        assert_eq!(s.vx, 0.0);
        assert!(s.stop);
    }

    #[test]
    fn conflicting_axis_is_rejected() {
        let err = VelocityCommand::from_parts(Some(1.0), None, None, Some(0.5), None, None, false)
            .unwrap_err();
        assert_eq!(err, StriderError::ConflictingAxisCommand { axis: Axis::Vx });

        let cmd =
            VelocityCommand::from_parts(Some(1.0), None, None, None, Some(0.2), Some(0.3), false)
                .unwrap();
        assert_eq!(cmd.vx, AxisCommand::Delta(1.0));
        assert_eq!(cmd.vy, AxisCommand::Absolute(0.2));
        assert_eq!(cmd.vyaw, AxisCommand::Absolute(0.3));
    }

    #[test]
    fn vy_delta_is_rejected_without_side_effects() {
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(ProfileConfig::default(), t0);
        p.update_at(&VelocityCommand::absolute(1.0, 0.0, 0.0), t0 + ms(20))
            .unwrap();
        let cmd = VelocityCommand {
            vy: AxisCommand::Delta(1.0),
            ..VelocityCommand::idle()
        };
        let err = p.update_at(&cmd, t0 + ms(40)).unwrap_err();
        assert_eq!(err, StriderError::UnsupportedAxis { axis: Axis::Vy });
        assert_eq!(p.vx(), 1.0);
        assert_eq!(p.last_update_at(), t0 + ms(20));
    }

    #[test]
    fn non_finite_command_is_rejected() {
        let mut p = VelocityProfile::new(ProfileConfig::default());
        let cmd = VelocityCommand::delta(f32::NAN, 0.0);
        assert!(matches!(p.update(&cmd), Err(StriderError::InvalidCommand(_))));
        let cmd = VelocityCommand::absolute(0.0, 0.0, f32::INFINITY);
        assert!(matches!(p.update(&cmd), Err(StriderError::InvalidCommand(_))));
    }

    #[test]
    fn reset_returns_to_rest() {
        let t0 = Instant::now();
        let mut p = VelocityProfile::new_at(ProfileConfig::default(), t0);
        p.update_at(&VelocityCommand::absolute(1.0, 1.0, 1.0), t0 + ms(20))
            .unwrap();
        p.reset_at(t0 + ms(30));
        assert_eq!((p.vx(), p.vy(), p.vyaw()), (0.0, 0.0, 0.0));
        assert_eq!(p.last_update_at(), t0 + ms(30));
    }
}
