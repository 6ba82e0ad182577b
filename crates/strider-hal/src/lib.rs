//! `strider-hal` – Robot Boundary
//!
//! Everything the control core needs from the outside world, expressed as
//! traits so that vendor SDK bindings can be swapped without touching the
//! velocity or safety logic.
//!
//! # Modules
//!
//! - [`client`] – [`RobotClient`][client::RobotClient]: the locomotion
//!   command surface (move, gait switch, body pose, stop, damp) plus state
//!   queries decoded into a typed [`RobotState`][strider_types::RobotState].
//! - [`obstacle`] – [`ObstacleAvoidClient`][obstacle::ObstacleAvoidClient]:
//!   the vendor obstacle-avoidance toggle, switched off once at startup.
//! - [`input`] – controller frames and the single-consumer
//!   [`InputSubscription`][input::InputSubscription] that delivers them.
//! - [`timeout`] – [`TimeoutClient`][timeout::TimeoutClient]: bounds every
//!   call by the configured client deadline.
//! - [`sim`] – in-process drivers that record every command, for headless
//!   runs and tests.

pub mod client;
pub mod input;
pub mod obstacle;
pub mod sim;
pub mod timeout;

pub use client::{RawStateMap, RobotClient, STATE_KEYS, StatusCode, decode_state};
pub use input::{
    ControllerFrame, ControllerSender, InputSubscription, SubscriptionHandle, controller_channel,
};
pub use obstacle::{ObstacleAvoidClient, disable_obstacle_avoidance};
pub use sim::{RobotCommand, SimObstacleAvoid, SimRobotClient};
pub use timeout::{DEFAULT_CLIENT_TIMEOUT, TimeoutClient};
