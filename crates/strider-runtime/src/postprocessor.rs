//! [`PostprocessorLoop`] – the fixed-rate velocity dispatch loop.
//!
//! Turns the sparse action intents delivered through an [`ActionSender`]
//! into a continuous velocity command stream.  Each tick:
//!
//! 1. **Refresh** – query the robot state.  A failed query keeps the last
//!    known state and the loop carries on.
//! 2. **Drain** – move every queued [`ActionSample`] into the action history.
//! 3. **Interlock** – while the [`EstopLatch`] is set, queued intents are
//!    dropped, the profile is held at rest, and nothing is sent.
//! 4. **Pause** – while the running flag is clear, nothing else happens (no
//!    decay is applied either).
//! 5. **Integrate** – the latest intent becomes a [`VelocityCommand`] and
//!    advances the [`VelocityProfile`].  An intent older than the action
//!    timeout is discarded in favour of a stop.
//! 6. **Dispatch** – stop, walk or run, switching gait first when needed.
//! 7. **Look down** – an additional body pose for the `LookDown` intent.
//!
//! Robot client failures are logged and never end the loop.  When
//! [`PostprocessorLoop::run`] returns, the attached controller subscription
//! has been released, whatever the exit path.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strider_hal::SimRobotClient;
//! use strider_kernel::EstopLatch;
//! use strider_runtime::postprocessor::{PostprocessorConfig, PostprocessorLoop};
//! use strider_runtime::velocity_profile::ProfileConfig;
//! use strider_types::ActionIntent;
//!
//! # async fn demo() -> Result<(), strider_types::StriderError> {
//! let client = Arc::new(SimRobotClient::new());
//! let (postprocessor, actions) = PostprocessorLoop::new(
//!     PostprocessorConfig::default(),
//!     ProfileConfig::default(),
//!     client,
//!     EstopLatch::new(),
//! )?;
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let task = tokio::spawn(postprocessor.run(shutdown_rx));
//! actions.action_callback(ActionIntent::Forward)?;
//! shutdown_tx.send_replace(true);
//! task.await.ok();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strider_hal::{RobotClient, STATE_KEYS, StatusCode, SubscriptionHandle, decode_state};
use strider_kernel::EstopLatch;
use strider_types::{ActionIntent, ActionSample, Gait, RobotState, StriderError, VelocitySample};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::history::BoundedHistory;
use crate::velocity_profile::{ProfileConfig, VelocityCommand, VelocityProfile};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for [`PostprocessorLoop`].  Rates are in units/s².
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostprocessorConfig {
    /// Loop period in milliseconds (50 Hz by default).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// `vx` rate for `Forward` while already moving forward.
    #[serde(default = "default_forward_when_positive")]
    pub forward_vx_increase_rate_when_positive: f32,
    /// `vx` rate for `Forward` while stopped or moving backward.
    #[serde(default = "default_forward_when_negative")]
    pub forward_vx_increase_rate_when_negative: f32,
    /// `vx` braking rate for `Backward` while moving forward.
    #[serde(default = "default_backward_when_positive")]
    pub backward_vx_decrease_rate_when_positive: f32,
    /// `vx` rate for `Backward` while stopped or moving backward.
    #[serde(default = "default_backward_when_negative")]
    pub backward_vx_decrease_rate_when_negative: f32,
    /// `vyaw` rate when turning further in the current direction.
    #[serde(default = "default_vyaw_increase_rate")]
    pub vyaw_increase_rate: f32,
    /// `vyaw` rate when turning against the current direction.
    #[serde(default = "default_reverse_vyaw_decrease_rate")]
    pub reverse_vyaw_decrease_rate: f32,

    /// An intent older than this (milliseconds) is replaced by a stop.
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
    /// Length of the action and velocity histories.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Intents buffered between two ticks before the sender sees an error.
    #[serde(default = "default_action_queue_capacity")]
    pub action_queue_capacity: usize,

    /// Switch to the run gait after sustained high forward speed.
    #[serde(default)]
    pub enable_run_gait: bool,
    /// Always treat the robot as running: every motion goes to the run gait
    /// and stops never switch back to walk first.
    #[serde(default)]
    pub always_use_run: bool,
    /// Forward speed (m/s) that must be exceeded to run.
    #[serde(default = "default_run_velocity_threshold")]
    pub run_velocity_threshold: f32,
    /// How long (milliseconds) the speed must be held before running.
    #[serde(default = "default_run_time_threshold_ms")]
    pub run_time_threshold_ms: u64,

    /// Body pitch (rad) for the look-down pose.
    #[serde(default = "default_look_down_pitch")]
    pub look_down_pitch: f32,
    /// Body height offset (m) for the look-down pose.
    #[serde(default = "default_look_down_body_height")]
    pub look_down_body_height: f32,

    /// Whether the loop processes intents as soon as it starts.
    #[serde(default = "default_start_running")]
    pub start_running: bool,
}

fn default_tick_ms() -> u64 {
    20
}
fn default_forward_when_positive() -> f32 {
    1.5
}
fn default_forward_when_negative() -> f32 {
    3.0
}
fn default_backward_when_positive() -> f32 {
    3.0
}
fn default_backward_when_negative() -> f32 {
    1.5
}
fn default_vyaw_increase_rate() -> f32 {
    2.0
}
fn default_reverse_vyaw_decrease_rate() -> f32 {
    4.0
}
fn default_action_timeout_ms() -> u64 {
    500
}
fn default_history_capacity() -> usize {
    crate::history::DEFAULT_HISTORY_CAPACITY
}
fn default_action_queue_capacity() -> usize {
    64
}
fn default_run_velocity_threshold() -> f32 {
    1.2
}
fn default_run_time_threshold_ms() -> u64 {
    1_000
}
fn default_look_down_pitch() -> f32 {
    0.75
}
fn default_look_down_body_height() -> f32 {
    -0.07
}
fn default_start_running() -> bool {
    true
}

impl Default for PostprocessorConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            forward_vx_increase_rate_when_positive: default_forward_when_positive(),
            forward_vx_increase_rate_when_negative: default_forward_when_negative(),
            backward_vx_decrease_rate_when_positive: default_backward_when_positive(),
            backward_vx_decrease_rate_when_negative: default_backward_when_negative(),
            vyaw_increase_rate: default_vyaw_increase_rate(),
            reverse_vyaw_decrease_rate: default_reverse_vyaw_decrease_rate(),
            action_timeout_ms: default_action_timeout_ms(),
            history_capacity: default_history_capacity(),
            action_queue_capacity: default_action_queue_capacity(),
            enable_run_gait: false,
            always_use_run: false,
            run_velocity_threshold: default_run_velocity_threshold(),
            run_time_threshold_ms: default_run_time_threshold_ms(),
            look_down_pitch: default_look_down_pitch(),
            look_down_body_height: default_look_down_body_height(),
            start_running: default_start_running(),
        }
    }
}

impl PostprocessorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn run_time_threshold(&self) -> Duration {
        Duration::from_millis(self.run_time_threshold_ms)
    }

    /// # Errors
    ///
    /// Returns [`StriderError::Config`] for a zero tick period or a
    /// non-finite rate.
    pub fn validate(&self) -> Result<(), StriderError> {
        if self.tick_ms == 0 {
            return Err(StriderError::Config(
                "postprocessor.tick_ms must be positive".to_string(),
            ));
        }
        let rates = [
            self.forward_vx_increase_rate_when_positive,
            self.forward_vx_increase_rate_when_negative,
            self.backward_vx_decrease_rate_when_positive,
            self.backward_vx_decrease_rate_when_negative,
            self.vyaw_increase_rate,
            self.reverse_vyaw_decrease_rate,
            self.run_velocity_threshold,
            self.look_down_pitch,
            self.look_down_body_height,
        ];
        if rates.iter().any(|r| !r.is_finite()) {
            return Err(StriderError::Config(
                "postprocessor rates must be finite numbers".to_string(),
            ));
        }
        Ok(())
    }

    /// Map an intent to a profile command given the current `vx` and `vyaw`.
    ///
    /// The rate depends on the sign of the current velocity so that braking
    /// and accelerating feel different.
    pub fn command_for(&self, intent: ActionIntent, vx: f32, vyaw: f32) -> VelocityCommand {
        match intent {
            ActionIntent::Stop => VelocityCommand::stop(),
            ActionIntent::Forward => {
                let rate = if vx > 0.0 {
                    self.forward_vx_increase_rate_when_positive
                } else {
                    self.forward_vx_increase_rate_when_negative
                };
                VelocityCommand::vx_delta(rate)
            }
            ActionIntent::Backward => {
                let rate = if vx > 0.0 {
                    self.backward_vx_decrease_rate_when_positive
                } else {
                    self.backward_vx_decrease_rate_when_negative
                };
                VelocityCommand::vx_delta(-rate)
            }
            ActionIntent::Left => {
                let rate = if vyaw > 0.0 {
                    self.vyaw_increase_rate
                } else {
                    self.reverse_vyaw_decrease_rate
                };
                VelocityCommand::vyaw_delta(rate)
            }
            ActionIntent::Right => {
                let rate = if vyaw > 0.0 {
                    self.reverse_vyaw_decrease_rate
                } else {
                    self.vyaw_increase_rate
                };
                VelocityCommand::vyaw_delta(-rate)
            }
            ActionIntent::Neutral | ActionIntent::LookDown => VelocityCommand::idle(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared handles
// ─────────────────────────────────────────────────────────────────────────────

/// Latest robot state as seen by the loop, published after every refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    /// Status code of the most recent state query.
    pub code: StatusCode,
    /// Last successfully decoded state, if any.
    pub state: Option<RobotState>,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            code: StatusCode::OK,
            state: None,
        }
    }
}

/// Caller-side handle: enqueues intents and pauses or resumes the loop.
///
/// Clones share the same queue and running flag.
#[derive(Debug, Clone)]
pub struct ActionSender {
    tx: mpsc::Sender<ActionSample>,
    running: Arc<AtomicBool>,
}

impl ActionSender {
    /// Enqueue `intent`, stamped now.  Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`StriderError::Channel`] when the queue is full or the loop
    /// has shut down.
    pub fn action_callback(&self, intent: ActionIntent) -> Result<(), StriderError> {
        self.action_callback_at(intent, Instant::now())
    }

    /// Enqueue `intent` stamped with `received_at`.
    ///
    /// # Errors
    ///
    /// See [`action_callback`](Self::action_callback).
    pub fn action_callback_at(
        &self,
        intent: ActionIntent,
        received_at: Instant,
    ) -> Result<(), StriderError> {
        debug!(%intent, "action received");
        self.tx
            .try_send(ActionSample::new(intent, received_at))
            .map_err(|e| StriderError::Channel(format!("action '{intent}' dropped: {e}")))
    }

    /// Pause (`false`) or resume (`true`) velocity processing.
    pub fn set_running(&self, running: bool) {
        let was = self.running.swap(running, Ordering::AcqRel);
        if was != running {
            info!(running, "postprocessor running state changed");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Result of one [`PostprocessorLoop::tick_at`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The emergency stop is latched; nothing was sent.
    EmergencyStopped,
    /// The loop is paused; nothing was sent.
    Paused,
    /// The stop sequence was dispatched.
    Stopped(VelocitySample),
    /// A walk-gait move was dispatched.
    Walked(VelocitySample),
    /// A run-gait move was dispatched.
    Ran(VelocitySample),
}

/// Releases the controller subscription when the loop exits.
struct SubscriptionGuard(Option<SubscriptionHandle>);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.close();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PostprocessorLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the velocity profile and both histories.
pub struct PostprocessorLoop {
    config: PostprocessorConfig,
    client: Arc<dyn RobotClient>,
    profile: VelocityProfile,
    actions: BoundedHistory<ActionSample>,
    velocities: BoundedHistory<VelocitySample>,
    queue: mpsc::Receiver<ActionSample>,
    running: Arc<AtomicBool>,
    latch: EstopLatch,
    robot: Option<RobotState>,
    state_ok: bool,
    state_tx: watch::Sender<StateSnapshot>,
    subscription: Option<SubscriptionHandle>,
    was_estopped: bool,
    ticks: u64,
}

impl PostprocessorLoop {
    /// Build a loop driving `client`, gated by `latch`.
    ///
    /// # Errors
    ///
    /// Returns [`StriderError::Config`] when either configuration is invalid.
    pub fn new(
        config: PostprocessorConfig,
        profile_config: ProfileConfig,
        client: Arc<dyn RobotClient>,
        latch: EstopLatch,
    ) -> Result<(Self, ActionSender), StriderError> {
        config.validate()?;
        profile_config.validate()?;

        let now = Instant::now();
        let (tx, queue) = mpsc::channel(config.action_queue_capacity.max(1));
        let running = Arc::new(AtomicBool::new(config.start_running));
        let (state_tx, _) = watch::channel(StateSnapshot::default());

        let postprocessor = Self {
            actions: BoundedHistory::new(config.history_capacity, ActionSample::idle(now)),
            velocities: BoundedHistory::new(config.history_capacity, VelocitySample::stopped(now)),
            profile: VelocityProfile::new_at(profile_config, now),
            config,
            client,
            queue,
            running: Arc::clone(&running),
            latch,
            robot: None,
            state_ok: true,
            state_tx,
            subscription: None,
            was_estopped: false,
            ticks: 0,
        };
        Ok((postprocessor, ActionSender { tx, running }))
    }

    /// Release `handle` when the loop exits.
    pub fn with_subscription(mut self, handle: SubscriptionHandle) -> Self {
        self.subscription = Some(handle);
        self
    }

    /// Subscribe to the robot state published after every refresh.
    pub fn state_receiver(&self) -> watch::Receiver<StateSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn config(&self) -> &PostprocessorConfig {
        &self.config
    }

    pub fn profile(&self) -> &VelocityProfile {
        &self.profile
    }

    pub fn actions(&self) -> &BoundedHistory<ActionSample> {
        &self.actions
    }

    pub fn velocities(&self) -> &BoundedHistory<VelocitySample> {
        &self.velocities
    }

    /// Last successfully decoded robot state.
    pub fn robot_state(&self) -> Option<&RobotState> {
        self.robot.as_ref()
    }

    /// Drive the loop at the configured rate until `shutdown` turns `true`
    /// (or its sender is dropped).  Returns the number of ticks run.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let _guard = SubscriptionGuard(self.subscription.take());
        if *shutdown.borrow() {
            info!("postprocessor shut down before starting");
            return 0;
        }

        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(tick_ms = self.config.tick_ms, "postprocessor loop started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(ticks = self.ticks, "postprocessor loop stopped");
        self.ticks
    }

    /// Run one tick now.
    pub async fn tick(&mut self) -> TickOutcome {
        self.tick_at(Instant::now()).await
    }

    /// Run one tick as if the current time were `now`.
    pub async fn tick_at(&mut self, now: Instant) -> TickOutcome {
        self.ticks += 1;
        self.refresh_state().await;
        self.drain_actions();

        if self.latch.is_set() {
            if !self.was_estopped {
                warn!("emergency stop active; suppressing all robot commands");
                self.was_estopped = true;
            }
            self.actions.clear();
            self.velocities.clear();
            self.profile.reset_at(now);
            return TickOutcome::EmergencyStopped;
        }
        if self.was_estopped {
            info!("emergency stop cleared; resuming dispatch");
            self.was_estopped = false;
        }

        if !self.running.load(Ordering::Acquire) {
            return TickOutcome::Paused;
        }

        let intent = self.current_intent(now);
        let command = self
            .config
            .command_for(intent, self.profile.vx(), self.profile.vyaw());
        let sample = match self.profile.update_at(&command, now) {
            Ok(sample) => sample,
            Err(e) => {
                error!(error = %e, %intent, "velocity update rejected; stopping");
                self.profile.reset_at(now);
                VelocitySample::stopped(now)
            }
        };
        self.velocities.append(sample);
        debug!(tick = self.ticks, %intent, %sample, "dispatching");

        let outcome = if sample.stop {
            self.execute_stop().await;
            TickOutcome::Stopped(sample)
        } else if self.config.enable_run_gait && self.should_run(now) {
            self.execute_move(&sample, Gait::Run).await;
            TickOutcome::Ran(sample)
        } else {
            self.execute_move(&sample, Gait::Walk).await;
            TickOutcome::Walked(sample)
        };

        if intent == ActionIntent::LookDown {
            self.execute_look_down().await;
        }
        outcome
    }

    // ── Tick steps ───────────────────────────────────────────────────────────

    async fn refresh_state(&mut self) {
        let (code, raw) = self.client.get_state(&STATE_KEYS).await;
        let result = code
            .into_result("get_state")
            .and_then(|()| decode_state(&raw));
        match result {
            Ok(state) => {
                if !self.state_ok {
                    info!("robot state query recovered");
                }
                self.state_ok = true;
                self.robot = Some(state);
            }
            Err(e) => {
                // Hold the last known state.
                if self.state_ok {
                    warn!(error = %e, "robot state query failed; keeping last known state");
                } else {
                    debug!(error = %e, "robot state query still failing");
                }
                self.state_ok = false;
            }
        }
        self.state_tx.send_replace(StateSnapshot {
            code,
            state: self.robot.clone(),
        });
    }

    fn drain_actions(&mut self) {
        while let Ok(sample) = self.queue.try_recv() {
            self.actions.append(sample);
        }
    }

    fn current_intent(&mut self, now: Instant) -> ActionIntent {
        let Some(latest) = self.actions.latest().copied() else {
            return ActionIntent::Stop;
        };
        let age = now.saturating_duration_since(latest.received_at);
        if age > self.config.action_timeout() {
            warn!(
                age_ms = age.as_millis() as u64,
                "no action received recently; clearing action history"
            );
            self.actions.clear();
            return ActionIntent::Stop;
        }
        latest.intent
    }

    fn should_run(&self, now: Instant) -> bool {
        if self.velocities.is_empty() {
            return false;
        }
        if self.config.always_use_run {
            return true;
        }
        sustained_speed(
            &self.velocities,
            self.config.run_velocity_threshold,
            self.config.run_time_threshold(),
            now,
        )
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    fn in_gait(&self, gait: &Gait) -> bool {
        self.robot.as_ref().is_some_and(|r| &r.gait == gait)
    }

    async fn execute_stop(&self) {
        if !self.config.always_use_run && !self.in_gait(&Gait::Walk) {
            self.switch_gait(Gait::Walk).await;
            return;
        }
        check(self.client.set_euler(0.0, 0.0, 0.0).await, "set_euler");
        check(self.client.set_body_height(0.0).await, "set_body_height");
        check(self.client.stop_move().await, "stop_move");
    }

    async fn execute_move(&self, sample: &VelocitySample, gait: Gait) {
        if !self.in_gait(&gait) {
            info!(
                target_gait = %gait,
                current = ?self.robot.as_ref().map(|r| &r.gait),
                "not in target gait; switching"
            );
            self.switch_gait(gait).await;
            return;
        }
        check(
            self.client
                .move_velocity(sample.vx, sample.vy, sample.vyaw)
                .await,
            "move",
        );
    }

    async fn execute_look_down(&self) {
        match &self.robot {
            Some(robot) if !robot.is_locomotion() => {
                check(
                    self.client
                        .set_euler(0.0, self.config.look_down_pitch, 0.0)
                        .await,
                    "set_euler",
                );
                check(
                    self.client
                        .set_body_height(self.config.look_down_body_height)
                        .await,
                    "set_body_height",
                );
            }
            _ => {
                debug!("robot is in locomotion; stopping instead of looking down");
                self.execute_stop().await;
            }
        }
    }

    async fn switch_gait(&self, gait: Gait) {
        let Some(id) = gait.id() else {
            warn!(%gait, "gait has no numeric id; not switching");
            return;
        };
        check(self.client.switch_gait(id).await, "switch_gait");
    }
}

/// Log a failed client call.  The loop carries on either way.
fn check(code: StatusCode, command: &str) {
    if let Err(e) = code.into_result(command) {
        warn!(error = %e, "robot command not applied");
    }
}

/// `true` when every recorded sample from newest back to at least `window`
/// ago moved forward faster than `threshold`.
///
/// A full history of fast samples also counts, since its span is capped by
/// the history capacity and may be shorter than `window`.  A partly filled
/// history that does not reach back `window` is not sustained.
pub fn sustained_speed(
    history: &BoundedHistory<VelocitySample>,
    threshold: f32,
    window: Duration,
    now: Instant,
) -> bool {
    for sample in history.valid_iter().rev() {
        if sample.vx <= threshold {
            return false;
        }
        if now.saturating_duration_since(sample.computed_at) >= window {
            return true;
        }
    }
    !history.is_empty() && history.valid_count() == history.capacity()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
