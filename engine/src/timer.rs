use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delta-time countdown.
///
/// `tick` reports `true` only on the tick that reaches zero, so callers can
/// fire one-shot effects without tracking a separate "already fired" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    duration: Duration,
    remaining: Duration,
}

impl Countdown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            remaining: duration,
        }
    }

    /// A countdown that has already finished.
    pub fn idle() -> Self {
        Self {
            duration: Duration::ZERO,
            remaining: Duration::ZERO,
        }
    }

    pub fn restart_with(&mut self, duration: Duration) {
        self.duration = duration;
        self.remaining = duration;
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn elapsed(&self) -> Duration {
        self.duration.saturating_sub(self.remaining)
    }

    pub fn is_finished(&self) -> bool {
        self.remaining.is_zero()
    }

    pub fn tick(&mut self, dt: Duration) -> bool {
        if self.is_finished() {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(dt);
        self.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_finish_exactly_once() {
        let mut c = Countdown::new(Duration::from_millis(250));
        assert!(!c.tick(Duration::from_millis(100)));
        assert!(!c.tick(Duration::from_millis(100)));
        assert!(c.tick(Duration::from_millis(100)));
        assert!(c.is_finished());
        assert!(!c.tick(Duration::from_millis(100)));
        assert_eq!(c.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn restart_with_replaces_duration() {
        let mut c = Countdown::idle();
        assert!(c.is_finished());
        c.restart_with(Duration::from_secs(2));
        assert_eq!(c.remaining(), Duration::from_secs(2));
        c.tick(Duration::from_secs(1));
        c.restart_with(Duration::from_secs(3));
        assert_eq!(c.remaining(), Duration::from_secs(3));
        assert_eq!(c.elapsed(), Duration::ZERO);
    }
}
