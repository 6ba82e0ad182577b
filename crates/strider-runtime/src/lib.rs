//! `strider-runtime` – The Control Loop
//!
//! Turns sparse motion intents into a smooth 50 Hz velocity stream and keeps
//! the controller's safety overrides in force while doing so.
//!
//! # Modules
//!
//! - [`history`] – [`BoundedHistory`][history::BoundedHistory]: fixed-length
//!   sample window used for queued intents and emitted velocities.
//! - [`velocity_profile`] – [`VelocityProfile`][velocity_profile::VelocityProfile]:
//!   integrates per-axis deltas, decays idle axes through their deadzones,
//!   clamps to the configured envelope and forces a stop on a stall.
//! - [`postprocessor`] – [`PostprocessorLoop`][postprocessor::PostprocessorLoop]:
//!   the fixed-rate loop that refreshes robot state, resolves the latest
//!   intent, advances the profile and dispatches stop / walk / run commands.
//!   Intents enter through its [`ActionSender`][postprocessor::ActionSender].
//! - [`controller`] – [`ControllerHandler`][controller::ControllerHandler]:
//!   consumes controller frames, drives the
//!   [`SafetySupervisor`][strider_kernel::SafetySupervisor] and issues the
//!   damp / balance-stand calls it decides on.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.
//!
//! # Emergency stop
//!
//! The [`ControllerHandler`] and the [`PostprocessorLoop`] share one
//! [`EstopLatch`].  Once it is set, the loop sends nothing to the robot until
//! the latch is released through the resume combination.

pub mod controller;
pub mod history;
pub mod postprocessor;
pub mod telemetry;
pub mod velocity_profile;

pub use controller::ControllerHandler;
pub use history::BoundedHistory;
pub use postprocessor::{
    ActionSender, PostprocessorConfig, PostprocessorLoop, StateSnapshot, TickOutcome,
};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use velocity_profile::{AxisCommand, ProfileConfig, VelocityCommand, VelocityProfile};

// Re-exported so callers can build the shared latch without a direct
// dependency on strider-kernel.
pub use strider_kernel::{EstopLatch, SafetyConfig};
