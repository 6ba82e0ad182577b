//! [`Debouncer`] – minimum spacing between accepted presses of one input.
//!
//! A controller key that is held down shows up in every frame the decoder
//! delivers, often faster than the control loop runs.  The debouncer turns
//! that stream into discrete presses: a press of key (or key combination)
//! `K` is accepted only when more than the configured window has passed
//! since the last *accepted* press of `K`.  Rejected presses do not move the stamp.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::keys::ControllerKeys;

/// Default spacing between accepted presses of the same key.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Per-key press debouncer.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use strider_kernel::{ControllerKeys, Debouncer};
///
/// let mut debouncer = Debouncer::new(Duration::from_millis(300));
/// let t0 = Instant::now();
/// assert!(debouncer.accept(ControllerKeys::DOWN, t0));
/// assert!(!debouncer.accept(ControllerKeys::DOWN, t0 + Duration::from_millis(300)));
/// assert!(debouncer.accept(ControllerKeys::DOWN, t0 + Duration::from_millis(301)));
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_pressed: HashMap<ControllerKeys, Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_pressed: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Offer a press of `key` observed at `now`.
    ///
    /// Returns `true` and records `now` when the press is accepted.  A key
    /// that has never been accepted is always accepted.
    pub fn accept(&mut self, key: ControllerKeys, now: Instant) -> bool {
        let accepted = match self.last_pressed.get(&key) {
            Some(last) => now.saturating_duration_since(*last) > self.window,
            None => true,
        };
        if accepted {
            self.last_pressed.insert(key, now);
        }
        accepted
    }

    /// Instant of the last accepted press of `key`.
    pub fn last_pressed(&self, key: ControllerKeys) -> Option<Instant> {
        self.last_pressed.get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn presses_inside_window_collapse_to_one() {
        let mut d = Debouncer::default();
        let t0 = Instant::now();
        let accepted = [0, 50, 120, 300]
            .into_iter()
            .filter(|&offset| d.accept(ControllerKeys::DOWN, t0 + ms(offset)))
            .count();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn presses_spaced_beyond_window_are_both_accepted() {
        let mut d = Debouncer::default();
        let t0 = Instant::now();
        assert!(d.accept(ControllerKeys::DOWN, t0));
        assert!(d.accept(ControllerKeys::DOWN, t0 + ms(301)));
        assert!(d.accept(ControllerKeys::DOWN, t0 + ms(700)));
    }

    #[test]
    fn rejected_press_does_not_extend_window() {
        let mut d = Debouncer::default();
        let t0 = Instant::now();
        assert!(d.accept(ControllerKeys::A, t0));
        assert!(!d.accept(ControllerKeys::A, t0 + ms(200)));
        // Measured from t0, not from the rejected press at 200 ms.
        assert!(d.accept(ControllerKeys::A, t0 + ms(310)));
        assert_eq!(d.last_pressed(ControllerKeys::A), Some(t0 + ms(310)));
    }

    #[test]
    fn keys_are_tracked_independently() {
        let mut d = Debouncer::default();
        let t0 = Instant::now();
        let estop = ControllerKeys::L2 | ControllerKeys::B;
        assert!(d.accept(estop, t0));
        assert!(d.accept(ControllerKeys::DOWN, t0 + ms(10)));
        assert!(!d.accept(estop, t0 + ms(20)));
    }
}
