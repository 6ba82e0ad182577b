//! [`ControllerHandler`] – applies safety decisions to the robot.
//!
//! The handler is the only owner of the [`SafetySupervisor`].  It consumes
//! controller frames from an [`InputSubscription`] as fast as they arrive,
//! independently of the postprocessor tick, and performs the robot calls
//! each [`FrameOutcome`] asks for:
//!
//! - emergency stop: `damp()`, then hold off for the debounce window so the
//!   damping takes effect before any further frame is handled;
//! - resume: `balance_stand()`;
//! - state report: log the latest [`StateSnapshot`] published by the loop.

use std::sync::Arc;
use std::time::Instant;

use strider_hal::{ControllerFrame, InputSubscription, RobotClient};
use strider_kernel::{EstopLatch, FrameOutcome, SafetyConfig, SafetyMode, SafetySupervisor};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::postprocessor::StateSnapshot;

/// Event-driven consumer of controller frames.
pub struct ControllerHandler {
    supervisor: SafetySupervisor,
    client: Arc<dyn RobotClient>,
    state: watch::Receiver<StateSnapshot>,
}

impl ControllerHandler {
    /// `latch` must be the one the postprocessor loop reads.
    pub fn new(
        config: SafetyConfig,
        latch: EstopLatch,
        client: Arc<dyn RobotClient>,
        state: watch::Receiver<StateSnapshot>,
    ) -> Self {
        Self {
            supervisor: SafetySupervisor::new(config, latch),
            client,
            state,
        }
    }

    pub fn mode(&self) -> SafetyMode {
        self.supervisor.mode()
    }

    /// Handle one frame received now.
    pub async fn on_frame(&mut self, frame: ControllerFrame) -> FrameOutcome {
        self.on_frame_at(frame, Instant::now()).await
    }

    /// Handle one frame received at `now`.
    pub async fn on_frame_at(&mut self, frame: ControllerFrame, now: Instant) -> FrameOutcome {
        let outcome = self.supervisor.handle_frame_at(frame.keys, now);
        if !outcome.pressed.is_empty() {
            debug!(keys = ?outcome.pressed.names(), "controller keys pressed");
        }

        if outcome.emergency_stop {
            let code = self.client.damp().await;
            if let Err(e) = code.into_result("damp") {
                error!(error = %e, "damp failed during emergency stop");
            }
            tokio::time::sleep(self.supervisor.config().debounce_window()).await;
        }

        if outcome.resume {
            let code = self.client.balance_stand().await;
            if let Err(e) = code.into_result("balance_stand") {
                warn!(error = %e, "balance stand failed after resume");
            }
        }

        if outcome.report_state {
            self.report_state();
        }

        outcome
    }

    /// Log the latest robot state seen by the postprocessor loop.
    pub fn report_state(&self) -> StateSnapshot {
        let snapshot = self.state.borrow().clone();
        match (&snapshot.state, snapshot.code.is_ok()) {
            (Some(robot), true) => info!(
                state = %robot.state,
                gait = %robot.gait,
                body_height = robot.body_height,
                foot_raise_height = robot.foot_raise_height,
                speed_level = robot.speed_level,
                joystick = %robot.joystick,
                dance = %robot.dance,
                continuous_gait = %robot.continuous_gait,
                economic_gait = %robot.economic_gait,
                "current robot state"
            ),
            _ => warn!(code = snapshot.code.0, "failed to get robot state"),
        }
        snapshot
    }

    /// Handle frames until the subscription is released or every sender is
    /// gone.  Returns the number of frames handled.
    pub async fn run(mut self, mut subscription: InputSubscription) -> u64 {
        info!("controller handler started");
        let mut frames = 0u64;
        while let Some(frame) = subscription.recv().await {
            frames += 1;
            self.on_frame(frame).await;
        }
        info!(frames, mode = ?self.mode(), "controller handler stopped");
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use strider_hal::{RobotCommand, SimRobotClient, StatusCode, controller_channel};
    use strider_kernel::ControllerKeys;
    use strider_types::{Gait, RobotState};

    const ESTOP: u16 = SafetySupervisor::ESTOP_COMBO.bits();
    const RESUME: u16 = SafetySupervisor::RESUME_COMBO.bits();

    fn fast_config() -> SafetyConfig {
        SafetyConfig {
            debounce_ms: 10,
            ..SafetyConfig::default()
        }
    }

    fn handler(
        client: Arc<SimRobotClient>,
        latch: EstopLatch,
    ) -> (ControllerHandler, watch::Sender<StateSnapshot>) {
        let (state_tx, state_rx) = watch::channel(StateSnapshot::default());
        (
            ControllerHandler::new(fast_config(), latch, client, state_rx),
            state_tx,
        )
    }

    #[tokio::test]
    async fn estop_damps_once_and_sets_shared_latch() {
        let client = Arc::new(SimRobotClient::new());
        let latch = EstopLatch::new();
        let (mut h, _state) = handler(client.clone(), latch.clone());

        let t0 = Instant::now();
        for i in 0..5 {
            h.on_frame_at(ControllerFrame::new(ESTOP), t0 + Duration::from_millis(i * 20))
                .await;
        }
        assert!(latch.is_set());
        assert_eq!(h.mode(), SafetyMode::EmergencyStopped);
        assert_eq!(client.commands(), vec![RobotCommand::Damp]);
    }

    #[tokio::test]
    async fn estop_waits_for_debounce_window() {
        let client = Arc::new(SimRobotClient::new());
        let (mut h, _state) = handler(client, EstopLatch::new());
        let started = tokio::time::Instant::now();
        h.on_frame(ControllerFrame::new(ESTOP)).await;
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn damp_failure_still_latches() {
        let client = Arc::new(SimRobotClient::new());
        client.fail("damp", StatusCode(3104));
        let latch = EstopLatch::new();
        let (mut h, _state) = handler(client, latch.clone());
        let outcome = h.on_frame(ControllerFrame::new(ESTOP)).await;
        assert!(outcome.emergency_stop);
        assert!(latch.is_set());
    }

    #[tokio::test]
    async fn resume_balances_robot() {
        let client = Arc::new(SimRobotClient::new());
        let latch = EstopLatch::new();
        let (mut h, _state) = handler(client.clone(), latch.clone());
        let t0 = Instant::now();

        h.on_frame_at(ControllerFrame::new(ESTOP), t0).await;
        let outcome = h
            .on_frame_at(ControllerFrame::new(RESUME), t0 + Duration::from_millis(50))
            .await;
        assert!(outcome.resume);
        assert!(!latch.is_set());
        assert_eq!(
            client.commands(),
            vec![RobotCommand::Damp, RobotCommand::BalanceStand]
        );
    }

    #[tokio::test]
    async fn report_uses_latest_snapshot() {
        let client = Arc::new(SimRobotClient::new());
        let (mut h, state_tx) = handler(client.clone(), EstopLatch::new());
        let robot = RobotState {
            state: "locomotion".to_string(),
            gait: Gait::Walk,
            ..RobotState::default()
        };
        state_tx.send_replace(StateSnapshot {
            code: StatusCode::OK,
            state: Some(robot.clone()),
        });

        let outcome = h
            .on_frame(ControllerFrame::new(ControllerKeys::DOWN.bits()))
            .await;
        assert!(outcome.report_state);
        assert_eq!(h.report_state().state, Some(robot));
        assert!(client.commands().is_empty());
    }

    #[tokio::test]
    async fn run_ends_when_subscription_closes() {
        let client = Arc::new(SimRobotClient::new());
        let latch = EstopLatch::new();
        let (h, _state) = handler(client.clone(), latch.clone());
        let (tx, sub, handle) = controller_channel(8);

        let task = tokio::spawn(h.run(sub));
        tx.send(ControllerFrame::new(0)).await.unwrap();
        tx.send(ControllerFrame::new(ESTOP)).await.unwrap();
        // Give the handler time to consume both frames.
        while !latch.is_set() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        handle.close();

        assert_eq!(task.await.unwrap(), 2);
        assert_eq!(client.commands(), vec![RobotCommand::Damp]);
    }
}
