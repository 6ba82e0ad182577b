//! Wireless-controller input frames and their delivery channel.
//!
//! The vendor decoder pushes one [`ControllerFrame`] per controller packet
//! through a [`ControllerSender`].  Exactly one consumer reads them from the
//! matching [`InputSubscription`].  A third handle, [`SubscriptionHandle`],
//! lets the owner of the control loop release the subscription from a
//! different task when it shuts down.

use strider_types::StriderError;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// One decoded controller packet: a bitmask of up to 16 pressed buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerFrame {
    pub keys: u16,
}

impl ControllerFrame {
    pub fn new(keys: u16) -> Self {
        Self { keys }
    }
}

/// Producer side of the controller channel.
#[derive(Debug, Clone)]
pub struct ControllerSender {
    tx: mpsc::Sender<ControllerFrame>,
}

impl ControllerSender {
    /// Deliver a frame, waiting for room in the channel.
    ///
    /// # Errors
    ///
    /// Returns [`StriderError::Channel`] once the subscription is released.
    pub async fn send(&self, frame: ControllerFrame) -> Result<(), StriderError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| StriderError::Channel("controller subscription closed".to_string()))
    }
}

/// Consumer side of the controller channel.
#[derive(Debug)]
pub struct InputSubscription {
    rx: mpsc::Receiver<ControllerFrame>,
    closed: watch::Receiver<bool>,
}

impl InputSubscription {
    /// Wait for the next frame.
    ///
    /// Returns `None` once the subscription has been released through its
    /// [`SubscriptionHandle`] or every sender has been dropped.
    pub async fn recv(&mut self) -> Option<ControllerFrame> {
        if *self.closed.borrow() {
            self.rx.close();
            return None;
        }
        tokio::select! {
            frame = self.rx.recv() => frame,
            _ = self.closed.changed() => {
                self.rx.close();
                None
            }
        }
    }

    /// `true` once the subscription has been released.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// Releases an [`InputSubscription`] from outside its consumer task.
#[derive(Debug)]
pub struct SubscriptionHandle {
    closed: watch::Sender<bool>,
}

impl SubscriptionHandle {
    /// Release the subscription.  Idempotent.
    pub fn close(&self) {
        if !*self.closed.borrow() {
            self.closed.send_replace(true);
            debug!("controller subscription released");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// Create a controller channel buffering at most `capacity` frames.
pub fn controller_channel(
    capacity: usize,
) -> (ControllerSender, InputSubscription, SubscriptionHandle) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (closed_tx, closed_rx) = watch::channel(false);
    (
        ControllerSender { tx },
        InputSubscription {
            rx,
            closed: closed_rx,
        },
        SubscriptionHandle { closed: closed_tx },
    )
}
