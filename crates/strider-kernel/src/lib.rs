//! `strider-kernel` – Safety Supervision
//!
//! Enforces the manual-override rules that sit above the velocity loop.  It
//! does not move the robot; it decides when the robot must not move.
//!
//! # Modules
//!
//! - [`keys`] – [`ControllerKeys`][keys::ControllerKeys]: the 16-button
//!   wireless-controller bitmask.
//! - [`debounce`] – [`Debouncer`][debounce::Debouncer]: per-key minimum
//!   spacing between accepted presses.
//! - [`supervisor`] – [`SafetySupervisor`][supervisor::SafetySupervisor]:
//!   the emergency-stop latch and its explicit resume path, driven by
//!   controller frames.

pub mod debounce;
pub mod keys;
pub mod supervisor;

pub use debounce::Debouncer;
pub use keys::ControllerKeys;
pub use supervisor::{EstopLatch, FrameOutcome, SafetyConfig, SafetyMode, SafetySupervisor};
