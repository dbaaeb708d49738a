use std::time::Duration;

use engine::pause::PauseContext;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One-shot notification returned by the tick that runs the clock out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUp;

/// The round countdown.
///
/// Two pause layers: a local one owned by the clock (flow mode freezes the
/// round timer through it) and the shared [`PauseContext`]. Either one stops
/// the countdown. Running out is terminal until [`GameClock::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameClock {
    #[serde(with = "crate::serde_secs")]
    limit: Duration,
    #[serde(with = "crate::serde_secs")]
    left: Duration,
    local_paused: bool,
    obey_global_pause: bool,
    finished: bool,
}

impl GameClock {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            left: limit,
            local_paused: false,
            obey_global_pause: true,
            finished: false,
        }
    }

    pub fn ignoring_global_pause(mut self) -> Self {
        self.obey_global_pause = false;
        self
    }

    pub fn reset(&mut self) {
        self.left = self.limit;
        self.local_paused = false;
        self.finished = false;
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn time_left(&self) -> Duration {
        self.left
    }

    pub fn elapsed(&self) -> Duration {
        self.limit.saturating_sub(self.left)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_locally_paused(&self) -> bool {
        self.local_paused
    }

    pub fn set_local_paused(&mut self, paused: bool) {
        self.local_paused = paused;
    }

    pub fn is_paused(&self, pause: &PauseContext) -> bool {
        self.local_paused || (self.obey_global_pause && pause.is_paused())
    }

    /// Returns `Some(TimeUp)` exactly once, on the tick that reaches zero.
    pub fn tick(&mut self, dt: Duration, pause: &PauseContext) -> Option<TimeUp> {
        if self.finished || self.is_paused(pause) {
            return None;
        }
        self.left = self.left.saturating_sub(dt);
        if self.left.is_zero() {
            self.finished = true;
            info!(limit_secs = self.limit.as_secs_f32(), "round clock finished");
            return Some(TimeUp);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_counts_only_while_unpaused() {
        let mut clock = GameClock::new(Duration::from_secs(20));
        let paused = PauseContext::new(true);

        clock.tick(Duration::from_secs(1), &paused);
        assert_eq!(clock.time_left(), Duration::from_secs(20));

        clock.tick(Duration::from_secs(2), &PauseContext::RUNNING);
        assert_eq!(clock.elapsed(), Duration::from_secs(2));

        clock.set_local_paused(true);
        clock.tick(Duration::from_secs(3), &PauseContext::RUNNING);
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn global_pause_can_be_ignored() {
        let mut clock = GameClock::new(Duration::from_secs(5)).ignoring_global_pause();
        clock.tick(Duration::from_secs(1), &PauseContext::new(true));
        assert_eq!(clock.time_left(), Duration::from_secs(4));
    }

    #[test]
    fn reset_restores_a_finished_clock() {
        let mut clock = GameClock::new(Duration::from_secs(1));
        assert_eq!(clock.tick(Duration::from_secs(2), &PauseContext::RUNNING), Some(TimeUp));
        clock.reset();
        assert!(!clock.is_finished());
        assert_eq!(clock.time_left(), Duration::from_secs(1));
    }
}
