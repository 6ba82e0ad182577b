//! [`SafetySupervisor`] – emergency-stop latch driven by controller frames.
//!
//! The supervisor turns raw controller bitmasks into three discrete events:
//!
//! - **Emergency stop** (`L2 + B`): `Normal → EmergencyStopped`.  The press is
//!   never swallowed by the debounce window; holding the combination across
//!   many frames still latches exactly once.
//! - **Resume** (`L2 + A`, debounced): `EmergencyStopped → Normal`, only when
//!   [`SafetyConfig::allow_resume`] is set.  With resume disabled the latch
//!   holds until the process restarts.
//! - **State report** (`DOWN`, debounced): ask the owner to log the latest
//!   robot state.
//!
//! The supervisor itself performs no I/O.  The returned [`FrameOutcome`]
//! tells the caller which robot commands to issue.  The latch is an
//! [`EstopLatch`] shared with the control loop, which reads it every tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::debounce::Debouncer;
use crate::keys::ControllerKeys;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Tunables for the safety supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Minimum spacing between accepted presses of one key, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Whether `L2 + A` may clear a latched emergency stop.
    #[serde(default = "default_allow_resume")]
    pub allow_resume: bool,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_allow_resume() -> bool {
    true
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            allow_resume: default_allow_resume(),
        }
    }
}

impl SafetyConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Latch
// ────────────────────────────────────────────────────────────────────────────

/// Shared emergency-stop flag.
///
/// Written by the controller handler, read by the control loop.  Clones share
/// the same flag.
#[derive(Debug, Clone, Default)]
pub struct EstopLatch(Arc<AtomicBool>);

impl EstopLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Latch the stop.  Returns `true` only if the flag was previously clear.
    pub fn set(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Release the stop.  Returns `true` only if the flag was previously set.
    pub fn clear(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Supervisor
// ────────────────────────────────────────────────────────────────────────────

/// Current safety mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyMode {
    Normal,
    EmergencyStopped,
}

/// What the caller must do in response to one controller frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameOutcome {
    /// The latch was just set: damp the robot, then hold off for the
    /// debounce window.
    pub emergency_stop: bool,
    /// The latch was just cleared: bring the robot back to a balanced stand.
    pub resume: bool,
    /// Log the latest robot state.
    pub report_state: bool,
    /// Keys held in this frame.
    pub pressed: ControllerKeys,
}

impl FrameOutcome {
    /// `true` when the frame requires no action.
    pub fn is_idle(&self) -> bool {
        !self.emergency_stop && !self.resume && !self.report_state
    }
}

/// Debounced key tracker plus the emergency-stop latch.
#[derive(Debug)]
pub struct SafetySupervisor {
    config: SafetyConfig,
    debouncer: Debouncer,
    latch: EstopLatch,
    key_state: ControllerKeys,
}

impl SafetySupervisor {
    /// Emergency-stop key combination.
    pub const ESTOP_COMBO: ControllerKeys = ControllerKeys::L2.union(ControllerKeys::B);
    /// Resume key combination.
    pub const RESUME_COMBO: ControllerKeys = ControllerKeys::L2.union(ControllerKeys::A);
    /// State-report key.
    pub const REPORT_KEY: ControllerKeys = ControllerKeys::DOWN;

    /// Create a supervisor that writes to `latch`.
    pub fn new(config: SafetyConfig, latch: EstopLatch) -> Self {
        Self {
            debouncer: Debouncer::new(config.debounce_window()),
            config,
            latch,
            key_state: ControllerKeys::empty(),
        }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// Current mode, read from the shared latch.
    pub fn mode(&self) -> SafetyMode {
        if self.latch.is_set() {
            SafetyMode::EmergencyStopped
        } else {
            SafetyMode::Normal
        }
    }

    /// Process one controller frame received at `now`.
    pub fn handle_frame_at(&mut self, keys: u16, now: Instant) -> FrameOutcome {
        let pressed = ControllerKeys::from_frame(keys);
        if pressed != self.key_state {
            debug!(keys = ?pressed.names(), "controller key state changed");
            self.key_state = pressed;
        }
        let mut outcome = FrameOutcome {
            pressed,
            ..FrameOutcome::default()
        };

        if pressed.holds(Self::ESTOP_COMBO) {
            // Keep the stamp fresh so a held combination is one press.
            self.debouncer.accept(Self::ESTOP_COMBO, now);
            if self.latch.set() {
                warn!("emergency stop latched (L2+B)");
                outcome.emergency_stop = true;
            }
        } else if pressed.holds(Self::RESUME_COMBO) && self.mode() == SafetyMode::EmergencyStopped {
            if !self.config.allow_resume {
                debug!("resume requested but disabled; emergency stop stays latched");
            } else if self.debouncer.accept(Self::RESUME_COMBO, now) && self.latch.clear() {
                info!("emergency stop released (L2+A)");
                outcome.resume = true;
            }
        }

        if pressed.contains(Self::REPORT_KEY) && self.debouncer.accept(Self::REPORT_KEY, now) {
            outcome.report_state = true;
        }

        outcome
    }
}
