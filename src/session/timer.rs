//! Cancellable silence timer.
//!
//! A single armed deadline against the injectable clock replaces
//! nullable-timer-handle bookkeeping: arm on the speech→silence edge,
//! cancel on speech resume or session stop, poll for expiry from the frame
//! loop.

use crate::clock::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline measured from the moment of arming.
pub struct SilenceTimer {
    clock: Arc<dyn Clock>,
    deadline: Option<Instant>,
}

impl SilenceTimer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            deadline: None,
        }
    }

    /// Arms (or re-arms) the timer `timeout` from now.
    pub fn arm(&mut self, timeout: Duration) {
        self.deadline = Some(self.clock.now() + timeout);
    }

    /// Cancels any pending deadline.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once an armed deadline has passed. A cancelled timer never
    /// expires.
    pub fn expired(&self) -> bool {
        match self.deadline {
            Some(deadline) => self.clock.now() >= deadline,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    fn timer_with_mock() -> (SilenceTimer, MockClock) {
        let mock = MockClock::new();
        let timer = SilenceTimer::new(Arc::new(mock.clone()));
        (timer, mock)
    }

    #[test]
    fn test_unarmed_timer_never_expires() {
        let (timer, mock) = timer_with_mock();
        assert!(!timer.is_armed());
        mock.advance(Duration::from_secs(100));
        assert!(!timer.expired());
    }

    #[test]
    fn test_armed_timer_expires_after_timeout() {
        let (mut timer, mock) = timer_with_mock();
        timer.arm(Duration::from_millis(3000));
        assert!(timer.is_armed());

        mock.advance(Duration::from_millis(2999));
        assert!(!timer.expired());

        mock.advance(Duration::from_millis(1));
        assert!(timer.expired());
    }

    #[test]
    fn test_cancel_disarms() {
        let (mut timer, mock) = timer_with_mock();
        timer.arm(Duration::from_millis(100));
        timer.cancel();

        mock.advance(Duration::from_secs(10));
        assert!(!timer.expired());
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_rearm_restarts_deadline() {
        let (mut timer, mock) = timer_with_mock();
        timer.arm(Duration::from_millis(100));
        mock.advance(Duration::from_millis(90));

        // Re-arming pushes the deadline out from "now".
        timer.arm(Duration::from_millis(100));
        mock.advance(Duration::from_millis(90));
        assert!(!timer.expired());

        mock.advance(Duration::from_millis(10));
        assert!(timer.expired());
    }
}
