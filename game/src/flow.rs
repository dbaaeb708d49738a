use std::collections::VecDeque;
use std::time::Duration;

use engine::timer::Countdown;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::GameClock;
use crate::error::ConfigError;

pub const FLOW_MAX: f32 = 100.0;

/// Flow resource in `0.0..=FLOW_MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGauge {
    value: f32,
}

impl FlowGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_full(&self) -> bool {
        self.value >= FLOW_MAX
    }

    /// Returns how much was actually added after clamping.
    pub fn add(&mut self, amount: f32) -> f32 {
        let before = self.value;
        self.value = (self.value + amount.max(0.0)).min(FLOW_MAX);
        self.value - before
    }

    /// Returns how much was actually removed after clamping.
    pub fn sub(&mut self, amount: f32) -> f32 {
        let before = self.value;
        self.value = (self.value - amount.max(0.0)).max(0.0);
        before - self.value
    }

    /// Empties the gauge, returning what was drained.
    pub fn reset(&mut self) -> f32 {
        std::mem::take(&mut self.value)
    }

    #[doc(hidden)]
    pub fn set_for_test(&mut self, value: f32) {
        self.value = value.clamp(0.0, FLOW_MAX);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    Normal,
    CanActivate,
    Active,
    SendPending,
}

/// What ends the Active phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowExitPolicy {
    Timer,
    Charges,
    #[default]
    Either,
}

impl FlowExitPolicy {
    pub fn uses_timer(self) -> bool {
        matches!(self, Self::Timer | Self::Either)
    }

    pub fn uses_charges(self) -> bool {
        matches!(self, Self::Charges | Self::Either)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    #[serde(with = "crate::serde_secs")]
    pub duration: Duration,
    pub exit_policy: FlowExitPolicy,
    pub charges: u32,
    /// Challenges generated while Active carry no required keys.
    pub relax_required_keys: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(10),
            exit_policy: FlowExitPolicy::Either,
            charges: 3,
            relax_required_keys: true,
        }
    }
}

impl FlowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exit_policy.uses_timer() && self.duration.is_zero() {
            return Err(ConfigError::NonPositive {
                field: "flow_mode.duration",
            });
        }
        if self.exit_policy.uses_charges() && self.charges == 0 {
            return Err(ConfigError::NonPositive {
                field: "flow_mode.charges",
            });
        }
        Ok(())
    }
}

/// A success banked during Active, paid out during SendPending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SendRecord {
    pub damage: f32,
    pub selected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowEvent {
    Armed,
    Activated,
    ChargeBanked { queued: usize, charges_left: u32 },
    SendPending { queued: usize },
    Sent(SendRecord),
    Deactivated { drained: f32 },
}

/// Normal -> CanActivate -> Active -> SendPending -> Normal.
///
/// The controller touches the clock and gauge only on transitions: Active
/// locally pauses the round clock, deactivation releases it and drains the
/// gauge.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowModeController {
    config: FlowConfig,
    state: FlowState,
    timer: Countdown,
    charges_left: u32,
    queue: VecDeque<SendRecord>,
}

impl FlowModeController {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            state: FlowState::Normal,
            timer: Countdown::idle(),
            charges_left: 0,
            queue: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn time_left(&self) -> Duration {
        self.timer.remaining()
    }

    pub fn charges_left(&self) -> u32 {
        self.charges_left
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Active or SendPending: the normal submit path is bypassed.
    pub fn is_engaged(&self) -> bool {
        matches!(self.state, FlowState::Active | FlowState::SendPending)
    }

    pub fn relaxes_requirements(&self) -> bool {
        self.state == FlowState::Active && self.config.relax_required_keys
    }

    /// Arms the mode once the gauge is full. Already-armed is a no-op.
    pub fn observe_gauge(&mut self, gauge: &FlowGauge) -> Option<FlowEvent> {
        if self.state != FlowState::Normal || !gauge.is_full() {
            return None;
        }
        self.state = FlowState::CanActivate;
        info!("flow mode armed");
        Some(FlowEvent::Armed)
    }

    pub fn try_activate(&mut self, chord_held: bool, clock: &mut GameClock) -> Option<FlowEvent> {
        if self.state != FlowState::CanActivate || !chord_held {
            return None;
        }
        self.state = FlowState::Active;
        self.timer.restart_with(self.config.duration);
        self.charges_left = self.config.charges;
        self.queue.clear();
        clock.set_local_paused(true);
        info!(
            duration_secs = self.config.duration.as_secs_f32(),
            policy = ?self.config.exit_policy,
            "flow mode active"
        );
        Some(FlowEvent::Activated)
    }

    pub fn tick(&mut self, dt: Duration, clock: &mut GameClock, gauge: &mut FlowGauge) -> Vec<FlowEvent> {
        if self.state != FlowState::Active || !self.config.exit_policy.uses_timer() {
            return Vec::new();
        }
        if self.timer.tick(dt) {
            debug!("flow timer expired");
            return self.enter_send_pending(clock, gauge);
        }
        Vec::new()
    }

    /// Records one satisfied judgment while Active.
    pub fn bank(
        &mut self,
        record: SendRecord,
        clock: &mut GameClock,
        gauge: &mut FlowGauge,
    ) -> Vec<FlowEvent> {
        if self.state != FlowState::Active {
            return Vec::new();
        }
        self.queue.push_back(record);
        if self.config.exit_policy.uses_charges() {
            self.charges_left = self.charges_left.saturating_sub(1);
        }
        let mut events = vec![FlowEvent::ChargeBanked {
            queued: self.queue.len(),
            charges_left: self.charges_left,
        }];
        if self.config.exit_policy.uses_charges() && self.charges_left == 0 {
            events.extend(self.enter_send_pending(clock, gauge));
        }
        events
    }

    /// Pays out the oldest banked record. The last one deactivates the mode.
    pub fn send_next(&mut self, clock: &mut GameClock, gauge: &mut FlowGauge) -> Vec<FlowEvent> {
        if self.state != FlowState::SendPending {
            return Vec::new();
        }
        let mut events = Vec::new();
        if let Some(record) = self.queue.pop_front() {
            events.push(FlowEvent::Sent(record));
        }
        if self.queue.is_empty() {
            events.push(self.deactivate(clock, gauge));
        }
        events
    }

    pub fn reset(&mut self) {
        self.state = FlowState::Normal;
        self.timer = Countdown::idle();
        self.charges_left = 0;
        self.queue.clear();
    }

    fn enter_send_pending(&mut self, clock: &mut GameClock, gauge: &mut FlowGauge) -> Vec<FlowEvent> {
        self.state = FlowState::SendPending;
        info!(queued = self.queue.len(), "flow mode sending");
        let mut events = vec![FlowEvent::SendPending {
            queued: self.queue.len(),
        }];
        if self.queue.is_empty() {
            events.push(self.deactivate(clock, gauge));
        }
        events
    }

    fn deactivate(&mut self, clock: &mut GameClock, gauge: &mut FlowGauge) -> FlowEvent {
        self.state = FlowState::Normal;
        self.timer = Countdown::idle();
        self.charges_left = 0;
        clock.set_local_paused(false);
        let drained = gauge.reset();
        info!("flow mode deactivated");
        FlowEvent::Deactivated { drained }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_clamps_and_reports_actual_delta() {
        let mut g = FlowGauge::new();
        assert_eq!(g.add(70.0), 70.0);
        assert_eq!(g.add(50.0), 30.0);
        assert!(g.is_full());
        assert_eq!(g.sub(120.0), 100.0);
        assert_eq!(g.value(), 0.0);
        assert_eq!(g.sub(5.0), 0.0);
    }

    #[test]
    fn empty_queue_deactivates_on_entering_send_pending() {
        let config = FlowConfig {
            exit_policy: FlowExitPolicy::Timer,
            duration: Duration::from_secs(1),
            ..FlowConfig::default()
        };
        let mut flow = FlowModeController::new(config);
        let mut clock = GameClock::new(Duration::from_secs(60));
        let mut gauge = FlowGauge::new();
        gauge.add(100.0);

        flow.observe_gauge(&gauge);
        flow.try_activate(true, &mut clock);
        let events = flow.tick(Duration::from_secs(1), &mut clock, &mut gauge);
        assert_eq!(
            events,
            vec![
                FlowEvent::SendPending { queued: 0 },
                FlowEvent::Deactivated { drained: 100.0 },
            ]
        );
        assert_eq!(flow.state(), FlowState::Normal);
        assert!(!clock.is_locally_paused());
    }

    #[test]
    fn validation_depends_on_exit_policy() {
        let timer_only = FlowConfig {
            exit_policy: FlowExitPolicy::Timer,
            charges: 0,
            ..FlowConfig::default()
        };
        assert!(timer_only.validate().is_ok());

        let charges_only = FlowConfig {
            exit_policy: FlowExitPolicy::Charges,
            duration: Duration::ZERO,
            ..FlowConfig::default()
        };
        assert!(charges_only.validate().is_ok());

        let either = FlowConfig {
            charges: 0,
            ..FlowConfig::default()
        };
        assert!(matches!(
            either.validate(),
            Err(ConfigError::NonPositive { field: "flow_mode.charges" })
        ));
    }
}
