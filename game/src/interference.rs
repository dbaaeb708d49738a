use std::fmt;
use std::time::Duration;

use engine::pause::PauseContext;
use engine::timer::Countdown;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Lower bound applied to the scheduling interval at runtime.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// A transient event that may block player input until it ends.
///
/// Handlers own their lifecycle after `begin`; the scheduler only observes
/// `is_running` to learn when one has finished.
pub trait Interference: fmt::Debug {
    fn name(&self) -> &'static str;
    fn is_running(&self) -> bool;
    fn blocks_input(&self) -> bool;
    fn begin(&mut self, rng: &mut dyn RngCore);
    fn end(&mut self);
    fn tick(&mut self, dt: Duration, rng: &mut dyn RngCore);
    /// One dismiss action (Enter). Returns `true` if it was consumed.
    fn dismiss(&mut self) -> bool;
    fn clone_box(&self) -> Box<dyn Interference>;
}

impl Clone for Box<dyn Interference> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

fn roll(rng: &mut dyn RngCore, low: Duration, high: Duration) -> Duration {
    if high <= low {
        return low;
    }
    rng.random_range(low..=high)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorWindowConfig {
    pub spawn_count: u32,
    #[serde(with = "crate::serde_secs")]
    pub spawn_interval_min: Duration,
    #[serde(with = "crate::serde_secs")]
    pub spawn_interval_max: Duration,
}

impl Default for ErrorWindowConfig {
    fn default() -> Self {
        Self {
            spawn_count: 20,
            spawn_interval_min: Duration::from_millis(20),
            spawn_interval_max: Duration::from_millis(60),
        }
    }
}

/// A burst of error popups. Windows spawn one at a time; once spawning is
/// over each dismiss closes the newest one. Input stays blocked until the
/// last window is gone.
#[derive(Debug, Clone)]
pub struct ErrorWindowBurst {
    config: ErrorWindowConfig,
    running: bool,
    spawned: u32,
    open: Vec<u32>,
    since_spawn: Duration,
    next_spawn: Duration,
}

impl ErrorWindowBurst {
    pub fn new(config: ErrorWindowConfig) -> Self {
        Self {
            config,
            running: false,
            spawned: 0,
            open: Vec::new(),
            since_spawn: Duration::ZERO,
            next_spawn: Duration::ZERO,
        }
    }

    pub fn open_windows(&self) -> usize {
        self.open.len()
    }

    pub fn is_spawning(&self) -> bool {
        self.running && self.spawned < self.config.spawn_count
    }

    fn spawn(&mut self) {
        self.spawned += 1;
        self.open.push(self.spawned);
    }

    fn settle(&mut self) {
        if !self.is_spawning() && self.open.is_empty() {
            self.running = false;
        }
    }
}

impl Interference for ErrorWindowBurst {
    fn name(&self) -> &'static str {
        "error_windows"
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn blocks_input(&self) -> bool {
        true
    }

    fn begin(&mut self, rng: &mut dyn RngCore) {
        self.running = true;
        self.spawned = 0;
        self.open.clear();
        self.since_spawn = Duration::ZERO;
        if self.config.spawn_count > 0 {
            self.spawn();
        }
        self.next_spawn = roll(rng, self.config.spawn_interval_min, self.config.spawn_interval_max);
        self.settle();
    }

    fn end(&mut self) {
        self.running = false;
        self.open.clear();
    }

    fn tick(&mut self, dt: Duration, rng: &mut dyn RngCore) {
        if !self.is_spawning() {
            return;
        }
        self.since_spawn += dt;
        while self.is_spawning() && self.since_spawn >= self.next_spawn {
            self.since_spawn -= self.next_spawn;
            self.spawn();
            self.next_spawn =
                roll(rng, self.config.spawn_interval_min, self.config.spawn_interval_max);
        }
    }

    fn dismiss(&mut self) -> bool {
        if !self.running || self.is_spawning() {
            return false;
        }
        let closed = self.open.pop().is_some();
        self.settle();
        closed
    }

    fn clone_box(&self) -> Box<dyn Interference> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterferenceConfig {
    pub enabled: bool,
    #[serde(with = "crate::serde_secs")]
    pub interval_min: Duration,
    #[serde(with = "crate::serde_secs")]
    pub interval_max: Duration,
    pub allow_overlap: bool,
    pub obey_global_pause: bool,
    /// Wait before retrying when the scheduler is busy.
    #[serde(with = "crate::serde_secs")]
    pub busy_retry: Duration,
    pub error_windows: ErrorWindowConfig,
}

impl Default for InterferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_min: Duration::from_secs(8),
            interval_max: Duration::from_secs(14),
            allow_overlap: false,
            obey_global_pause: true,
            busy_retry: Duration::from_millis(500),
            error_windows: ErrorWindowConfig::default(),
        }
    }
}

impl InterferenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_min > self.interval_max {
            return Err(ConfigError::InvertedRange {
                field: "interference.interval",
                low: self.interval_min.as_secs_f64(),
                high: self.interval_max.as_secs_f64(),
            });
        }
        if self.busy_retry.is_zero() {
            return Err(ConfigError::NonPositive {
                field: "interference.busy_retry",
            });
        }
        let windows = &self.error_windows;
        if windows.spawn_interval_min > windows.spawn_interval_max {
            return Err(ConfigError::InvertedRange {
                field: "interference.error_windows.spawn_interval",
                low: windows.spawn_interval_min.as_secs_f64(),
                high: windows.spawn_interval_max.as_secs_f64(),
            });
        }
        Ok(())
    }

    fn interval_bounds(&self) -> (Duration, Duration) {
        let low = self.interval_min.max(MIN_INTERVAL);
        (low, self.interval_max.max(low))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InterferenceEvent {
    Started { name: &'static str, blocks_input: bool },
    Ended { name: &'static str },
}

/// Fires a random idle handler from the pool at random intervals.
#[derive(Debug, Clone)]
pub struct InterferenceScheduler {
    pool: Vec<Box<dyn Interference>>,
    config: InterferenceConfig,
    next: Countdown,
    rng: StdRng,
}

impl InterferenceScheduler {
    /// Scheduler with the default pool (one error-window burst).
    pub fn new(config: InterferenceConfig, seed: u64) -> Self {
        let burst = ErrorWindowBurst::new(config.error_windows);
        Self::with_pool(config, vec![Box::new(burst)], seed)
    }

    pub fn with_pool(config: InterferenceConfig, pool: Vec<Box<dyn Interference>>, seed: u64) -> Self {
        let mut scheduler = Self {
            pool,
            config,
            next: Countdown::idle(),
            rng: StdRng::seed_from_u64(seed),
        };
        scheduler.reroll();
        scheduler
    }

    pub fn config(&self) -> &InterferenceConfig {
        &self.config
    }

    pub fn pool(&self) -> &[Box<dyn Interference>] {
        &self.pool
    }

    /// Time until the next activation attempt.
    pub fn next_attempt_in(&self) -> Duration {
        self.next.remaining()
    }

    pub fn any_running(&self) -> bool {
        self.pool.iter().any(|h| h.is_running())
    }

    pub fn is_blocking_input(&self) -> bool {
        self.pool.iter().any(|h| h.is_running() && h.blocks_input())
    }

    /// Ends every handler and restarts the schedule.
    pub fn reset(&mut self) {
        for handler in &mut self.pool {
            handler.end();
        }
        self.reroll();
    }

    /// Advances handlers and the schedule. `dismissals` is the number of
    /// dismiss actions the player made this tick; each goes to the newest
    /// running handler that accepts it.
    pub fn tick(&mut self, dt: Duration, pause: &PauseContext, dismissals: usize) -> Vec<InterferenceEvent> {
        if self.config.obey_global_pause && pause.is_paused() {
            return Vec::new();
        }
        let was_running: Vec<bool> = self.pool.iter().map(|h| h.is_running()).collect();

        for _ in 0..dismissals {
            let consumed = self
                .pool
                .iter_mut()
                .rev()
                .filter(|h| h.is_running())
                .any(|h| h.dismiss());
            if !consumed {
                break;
            }
        }
        for handler in self.pool.iter_mut().filter(|h| h.is_running()) {
            handler.tick(dt, &mut self.rng);
        }

        let mut events: Vec<InterferenceEvent> = self
            .pool
            .iter()
            .zip(&was_running)
            .filter(|(h, was)| **was && !h.is_running())
            .map(|(h, _)| {
                info!(name = h.name(), "interference ended");
                InterferenceEvent::Ended { name: h.name() }
            })
            .collect();

        if self.config.enabled && self.next.tick(dt) {
            events.extend(self.try_start());
        }
        events
    }

    fn try_start(&mut self) -> Option<InterferenceEvent> {
        if !self.config.allow_overlap && self.any_running() {
            debug!(retry_secs = self.config.busy_retry.as_secs_f32(), "interference busy, retrying");
            self.next.restart_with(self.config.busy_retry);
            return None;
        }
        let idle: Vec<usize> = (0..self.pool.len())
            .filter(|&i| !self.pool[i].is_running())
            .collect();
        if idle.is_empty() {
            self.next.restart_with(self.config.busy_retry);
            return None;
        }
        let pick = idle[self.rng.random_range(0..idle.len())];
        self.reroll();

        let handler = &mut self.pool[pick];
        handler.begin(&mut self.rng);
        info!(name = handler.name(), blocks_input = handler.blocks_input(), "interference started");
        Some(InterferenceEvent::Started {
            name: handler.name(),
            blocks_input: handler.blocks_input(),
        })
    }

    fn reroll(&mut self) {
        let (low, high) = self.config.interval_bounds();
        let interval = roll(&mut self.rng, low, high);
        self.next.restart_with(interval);
    }
}
