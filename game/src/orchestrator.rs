use std::time::Duration;

use engine::pause::PauseContext;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::board::ChallengeBoard;
use crate::challenge::{Challenge, ChallengeFactory};
use crate::clock::GameClock;
use crate::config::RoundConfig;
use crate::enemy::{EnemyKind, EnemyRoster};
use crate::error::{ConfigError, SelectionError};
use crate::events::{RoundEvent, StatusBoard, StatusCode};
use crate::flow::{FlowEvent, FlowGauge, FlowModeController, FlowState, SendRecord};
use crate::input::{InputBuffer, Key};
use crate::interference::{Interference, InterferenceScheduler};
use crate::judge::{self, Reward};
use crate::selection::{RangeWindow, SelectionChange, SelectionSet};

/// Inbound command from presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Click { slot: usize, modifier: bool },
    DoubleClick { slot: usize },
    Key { key: Key },
    Submit,
    RevealFinished { slot: usize },
}

/// Everything the input side reports for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInput {
    pub commands: Vec<Command>,
    /// Both flow-mode activation keys held.
    pub chord_held: bool,
    /// Requested global pause state, applied before gating.
    pub pause: Option<bool>,
}

impl FrameInput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn with_commands(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// Who gets to act this tick, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    TimeUp,
    Blocked,
    Paused,
    Open,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotSnapshot {
    pub challenge: Challenge,
    pub revealing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemySnapshot {
    pub kind: EnemyKind,
    pub hp: f32,
    pub suppression: f32,
}

/// Serializable view of a round for debugging and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundSnapshot {
    pub slots: Vec<SlotSnapshot>,
    pub selected: Vec<usize>,
    pub window: RangeWindow,
    pub input: String,
    pub time_left_secs: f32,
    pub gate: Gate,
    pub flow_gauge: f32,
    pub flow_state: FlowState,
    pub flow_time_left_secs: f32,
    pub flow_queued: usize,
    pub enemies: Vec<EnemySnapshot>,
    pub target: Option<usize>,
    pub status: StatusCode,
}

/// Owns all round state and runs the per-tick decision loop.
///
/// Each tick resolves in a fixed order: time-up, interference block, global
/// pause, then flow and player commands. A gate that closes ends the tick.
#[derive(Debug, Clone)]
pub struct RoundOrchestrator {
    config: RoundConfig,
    factory: ChallengeFactory,
    board: ChallengeBoard,
    selection: SelectionSet,
    input: InputBuffer,
    input_elapsed: Duration,
    clock: GameClock,
    pause: PauseContext,
    gauge: FlowGauge,
    flow: FlowModeController,
    interference: InterferenceScheduler,
    enemies: EnemyRoster,
    status: StatusBoard,
    blocked: bool,
}

fn interference_seed(seed: u64) -> u64 {
    seed.rotate_left(32) ^ 0x5EED_CAFE
}

impl RoundOrchestrator {
    pub fn new(config: RoundConfig, seed: u64) -> Result<Self, ConfigError> {
        let interference = InterferenceScheduler::new(config.interference, interference_seed(seed));
        Self::build(config, seed, interference)
    }

    /// Round with a custom interference pool.
    pub fn with_interference(
        config: RoundConfig,
        seed: u64,
        pool: Vec<Box<dyn Interference>>,
    ) -> Result<Self, ConfigError> {
        let interference =
            InterferenceScheduler::with_pool(config.interference, pool, interference_seed(seed));
        Self::build(config, seed, interference)
    }

    fn build(
        config: RoundConfig,
        seed: u64,
        interference: InterferenceScheduler,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut factory = ChallengeFactory::new(config.challenge, seed);
        let board = ChallengeBoard::new(config.slot_count, config.reveal_duration, &mut factory);
        let clock = GameClock::new(config.time_limit);
        info!(
            slots = config.slot_count,
            limit_secs = config.time_limit.as_secs_f32(),
            seed,
            "round created"
        );
        Ok(Self {
            factory,
            board,
            selection: SelectionSet::new(),
            input: InputBuffer::new(),
            input_elapsed: Duration::ZERO,
            clock,
            pause: PauseContext::RUNNING,
            gauge: FlowGauge::new(),
            flow: FlowModeController::new(config.flow_mode),
            interference,
            enemies: EnemyRoster::new(&config.enemies),
            status: StatusBoard::default(),
            blocked: false,
            config,
        })
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn board(&self) -> &ChallengeBoard {
        &self.board
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    /// Time spent on the current attempt.
    pub fn input_elapsed(&self) -> Duration {
        self.input_elapsed
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn pause(&self) -> &PauseContext {
        &self.pause
    }

    pub fn gauge(&self) -> &FlowGauge {
        &self.gauge
    }

    pub fn flow(&self) -> &FlowModeController {
        &self.flow
    }

    pub fn interference(&self) -> &InterferenceScheduler {
        &self.interference
    }

    pub fn enemies(&self) -> &EnemyRoster {
        &self.enemies
    }

    pub fn status(&self) -> StatusCode {
        self.status.current()
    }

    pub fn gate(&self) -> Gate {
        if self.clock.is_finished() {
            Gate::TimeUp
        } else if self.interference.is_blocking_input() {
            Gate::Blocked
        } else if self.pause.is_paused() {
            Gate::Paused
        } else {
            Gate::Open
        }
    }

    /// Returns `true` if the pause state changed.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        let changed = self.pause.set_paused(paused);
        if changed {
            info!(paused, "round pause changed");
        }
        changed
    }

    pub fn select_target(&mut self, index: usize) -> bool {
        self.enemies.select_target(index)
    }

    /// Advances the round by `dt`.
    pub fn tick(&mut self, dt: Duration, frame: &FrameInput) -> Vec<RoundEvent> {
        let mut events = Vec::new();
        if let Some(paused) = frame.pause {
            self.set_paused(paused);
        }
        for command in &frame.commands {
            if let Command::RevealFinished { slot } = *command {
                self.board.finish_reveal(slot);
            }
        }

        self.status.tick(dt);
        if !self.pause.is_paused() {
            self.board.tick(dt);
        }
        if self.clock.tick(dt, &self.pause).is_some() {
            self.on_time_up(&mut events);
        }
        if self.clock.is_finished() {
            return events;
        }

        // Commands issued while blocked never reach the round; Enter goes to
        // the interference instead.
        let blocked_at_start = self.interference.is_blocking_input();
        let dismissals = if blocked_at_start {
            frame
                .commands
                .iter()
                .filter(|c| matches!(c, Command::Submit))
                .count()
        } else {
            0
        };
        events.extend(
            self.interference
                .tick(dt, &self.pause, dismissals)
                .into_iter()
                .map(RoundEvent::Interference),
        );
        if self.check_blocked(&mut events) {
            return events;
        }

        if self.pause.is_paused() {
            self.input.set_accepting(false);
            return events;
        }

        self.sync_accepting();
        if !self.selection.is_empty() {
            self.input_elapsed += dt;
        }
        let flow_events = self.flow.tick(dt, &mut self.clock, &mut self.gauge);
        self.push_flow_events(flow_events, &mut events);
        self.observe_gauge(&mut events);
        if let Some(event) = self.flow.try_activate(frame.chord_held, &mut self.clock) {
            events.push(RoundEvent::Flow(event));
        }

        if !blocked_at_start {
            for command in &frame.commands {
                self.apply_command(*command, &mut events);
            }
        }
        if self.flow.state() == FlowState::Active {
            self.judge_continuous(&mut events);
        }

        self.observe_gauge(&mut events);
        self.settle_status(&mut events);
        events
    }

    pub fn click_slot(&mut self, slot: usize, modifier: bool) -> Vec<RoundEvent> {
        self.direct(Command::Click { slot, modifier })
    }

    pub fn double_click_slot(&mut self, slot: usize) -> Vec<RoundEvent> {
        self.direct(Command::DoubleClick { slot })
    }

    pub fn keystroke(&mut self, key: Key) -> Vec<RoundEvent> {
        self.direct(Command::Key { key })
    }

    /// Enter. While an interference blocks input this is a dismiss action.
    pub fn submit_pressed(&mut self) -> Vec<RoundEvent> {
        if self.gate() == Gate::Blocked {
            let mut events: Vec<RoundEvent> = self
                .interference
                .tick(Duration::ZERO, &self.pause, 1)
                .into_iter()
                .map(RoundEvent::Interference)
                .collect();
            if !self.check_blocked(&mut events) {
                self.settle_status(&mut events);
            }
            return events;
        }
        self.direct(Command::Submit)
    }

    /// The presentation layer finished a slot's reveal animation.
    pub fn reveal_finished(&mut self, slot: usize) -> bool {
        self.board.finish_reveal(slot)
    }

    pub fn finish_all_reveals(&mut self) {
        self.board.finish_all_reveals();
    }

    /// Starts a fresh round: new challenges, full clock, empty gauge, healed
    /// enemies, rescheduled interference.
    pub fn restart(&mut self) {
        self.factory.set_relaxed(false);
        self.board.refill(&mut self.factory);
        self.selection.clear();
        self.input.clear();
        self.input.set_accepting(false);
        self.input_elapsed = Duration::ZERO;
        self.clock.reset();
        self.gauge.reset();
        self.flow.reset();
        self.interference.reset();
        self.enemies.reset();
        self.status.reset();
        self.blocked = false;
        info!("round restarted");
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            slots: self
                .board
                .iter()
                .map(|slot| SlotSnapshot {
                    challenge: slot.challenge().clone(),
                    revealing: slot.is_revealing(),
                })
                .collect(),
            selected: self.selection.iter().collect(),
            window: self.selection.intersection(&self.board),
            input: self.input.text(),
            time_left_secs: self.clock.time_left().as_secs_f32(),
            gate: self.gate(),
            flow_gauge: self.gauge.value(),
            flow_state: self.flow.state(),
            flow_time_left_secs: self.flow.time_left().as_secs_f32(),
            flow_queued: self.flow.queued(),
            enemies: self
                .enemies
                .units()
                .iter()
                .map(|unit| EnemySnapshot {
                    kind: unit.kind(),
                    hp: unit.hp(),
                    suppression: unit.suppression_percent(),
                })
                .collect(),
            target: self.enemies.target(),
            status: self.status.current(),
        }
    }

    fn direct(&mut self, command: Command) -> Vec<RoundEvent> {
        let mut events = Vec::new();
        let gate = self.gate();
        if gate != Gate::Open {
            debug!(?command, ?gate, "command ignored");
            return events;
        }
        self.sync_accepting();
        self.apply_command(command, &mut events);
        if self.flow.state() == FlowState::Active {
            self.judge_continuous(&mut events);
        }
        self.observe_gauge(&mut events);
        self.settle_status(&mut events);
        events
    }

    fn on_time_up(&mut self, events: &mut Vec<RoundEvent>) {
        let change = self.selection.clear();
        if !change.was_empty {
            events.push(self.selection_event());
        }
        self.input.clear();
        self.input.set_accepting(false);
        events.push(self.status.show(StatusCode::TimeUp));
        events.push(RoundEvent::TimeUp);
    }

    /// Returns `true` while input is blocked. The first blocked tick clears
    /// the attempt and announces the interference.
    fn check_blocked(&mut self, events: &mut Vec<RoundEvent>) -> bool {
        if !self.interference.is_blocking_input() {
            self.blocked = false;
            return false;
        }
        self.input.set_accepting(false);
        if !self.blocked {
            self.blocked = true;
            self.input.clear();
            events.push(self.status.show(StatusCode::Interference));
        }
        true
    }

    fn sync_accepting(&mut self) {
        self.input.set_accepting(!self.selection.is_empty());
    }

    fn apply_command(&mut self, command: Command, events: &mut Vec<RoundEvent>) {
        match command {
            Command::Click {
                slot,
                modifier: false,
            } => self.select_single(slot, events),
            Command::Click {
                slot,
                modifier: true,
            }
            | Command::DoubleClick { slot } => self.toggle(slot, events),
            Command::Key { key } => {
                self.input.apply(key);
            }
            Command::Submit => self.submit(events),
            // Reveal signals are applied before gating.
            Command::RevealFinished { .. } => {}
        }
    }

    fn select_single(&mut self, slot: usize, events: &mut Vec<RoundEvent>) {
        match self.selection.select_single(slot, &self.board) {
            Ok(change) => {
                self.input.clear();
                self.input_elapsed = Duration::ZERO;
                self.after_selection_change(change, events);
            }
            Err(SelectionError::UnknownSlot { index }) => warn!(index, "click on unknown slot"),
            Err(err) => debug!(%err, "selection ignored"),
        }
    }

    fn toggle(&mut self, slot: usize, events: &mut Vec<RoundEvent>) {
        match self.selection.toggle(slot, &self.board) {
            Ok(change) => {
                if change.became_empty() || change.became_non_empty() {
                    self.input.clear();
                    self.input_elapsed = Duration::ZERO;
                }
                self.after_selection_change(change, events);
            }
            Err(SelectionError::UnknownSlot { index }) => warn!(index, "toggle on unknown slot"),
            Err(err) => {
                debug!(slot = err.index(), %err, "simultaneous selection rejected");
                events.push(
                    self.status
                        .force(StatusCode::SimulRejected, self.config.status_hold),
                );
            }
        }
    }

    fn after_selection_change(&mut self, change: SelectionChange, events: &mut Vec<RoundEvent>) {
        debug!(kind = ?change.kind, size = self.selection.len(), "selection changed");
        self.sync_accepting();
        events.push(self.selection_event());
    }

    fn selection_event(&self) -> RoundEvent {
        RoundEvent::SelectionChanged {
            selected: self.selection.iter().collect(),
            window: self.selection.intersection(&self.board),
        }
    }

    fn submit(&mut self, events: &mut Vec<RoundEvent>) {
        match self.flow.state() {
            FlowState::SendPending => {
                let flow_events = self.flow.send_next(&mut self.clock, &mut self.gauge);
                self.push_flow_events(flow_events, events);
                return;
            }
            FlowState::Active => {
                debug!("submit ignored while flow mode is active");
                return;
            }
            FlowState::Normal | FlowState::CanActivate => {}
        }
        if self.selection.is_empty() {
            debug!("submit with empty selection ignored");
            return;
        }

        let sendable = {
            let challenges = self.selection.challenges(&self.board);
            judge::is_sendable_for_set(&challenges, &self.input)
        };
        if sendable {
            self.on_success(events);
        } else {
            self.on_fail(events);
        }
    }

    fn current_reward(&self) -> Reward {
        let window = self.selection.intersection(&self.board);
        judge::reward(
            &self.config.scoring,
            self.input_elapsed,
            self.selection.len(),
            self.input.len(),
            window.min,
        )
    }

    fn on_success(&mut self, events: &mut Vec<RoundEvent>) {
        let reward = self.current_reward();
        debug!(
            selected = self.selection.len(),
            typed = self.input.len(),
            damage = reward.damage,
            time_mul = reward.time_mul,
            "submission succeeded"
        );
        self.apply_damage(reward.damage, events);
        let gained = self.gauge.add(reward.flow_gain);
        if gained > 0.0 {
            events.push(RoundEvent::FlowDelta { amount: gained });
        }
        self.complete_selection(events);
        events.push(
            self.status
                .force(StatusCode::Success, self.config.status_hold),
        );
    }

    fn on_fail(&mut self, events: &mut Vec<RoundEvent>) {
        debug!(
            selected = self.selection.len(),
            typed = self.input.len(),
            "submission failed"
        );
        let lost = self.gauge.sub(self.config.scoring.flow_loss);
        if lost > 0.0 {
            events.push(RoundEvent::FlowDelta { amount: -lost });
        }
        self.input.clear();
        events.push(self.status.force(StatusCode::Fail, self.config.status_hold));
    }

    /// While flow is Active every satisfied selection is banked instead of
    /// scored.
    fn judge_continuous(&mut self, events: &mut Vec<RoundEvent>) {
        let sendable = {
            let challenges = self.selection.challenges(&self.board);
            judge::is_sendable_for_set(&challenges, &self.input)
        };
        if !sendable {
            return;
        }
        let reward = self.current_reward();
        let record = SendRecord {
            damage: reward.damage,
            selected: self.selection.len(),
        };
        self.complete_selection(events);
        let flow_events = self.flow.bank(record, &mut self.clock, &mut self.gauge);
        self.push_flow_events(flow_events, events);
        events.push(
            self.status
                .force(StatusCode::Success, self.config.status_hold),
        );
    }

    /// Replaces every selected challenge in ascending slot order, then
    /// clears input and selection.
    fn complete_selection(&mut self, events: &mut Vec<RoundEvent>) {
        self.factory.set_relaxed(self.flow.relaxes_requirements());
        let reveal_secs = self.board.reveal_duration().as_secs_f32();
        let slots: Vec<usize> = self.selection.iter().collect();
        for slot in slots {
            let challenge = self.factory.create();
            self.board.replace(slot, challenge.clone());
            events.push(RoundEvent::ChallengeReplaced {
                slot,
                challenge,
                reveal_secs,
            });
        }
        self.input.clear();
        self.input_elapsed = Duration::ZERO;
        self.selection.clear();
        self.sync_accepting();
        events.push(self.selection_event());
    }

    fn apply_damage(&mut self, amount: f32, events: &mut Vec<RoundEvent>) {
        let Some(report) = self.enemies.apply_damage(amount) else {
            events.push(RoundEvent::Damage {
                amount,
                target: None,
                suppression: 100.0,
            });
            return;
        };
        events.push(RoundEvent::Damage {
            amount,
            target: Some(report.target),
            suppression: report.suppression,
        });
        if report.suppressed {
            events.push(RoundEvent::EnemySuppressed {
                target: report.target,
            });
        }
        if report.suppressed && report.cleared {
            events.push(RoundEvent::EnemiesCleared);
        }
    }

    fn push_flow_events(&mut self, flow_events: Vec<FlowEvent>, events: &mut Vec<RoundEvent>) {
        for event in flow_events {
            events.push(RoundEvent::Flow(event));
            match event {
                FlowEvent::Sent(record) => self.apply_damage(record.damage, events),
                FlowEvent::Deactivated { drained } if drained > 0.0 => {
                    events.push(RoundEvent::FlowDelta { amount: -drained });
                }
                _ => {}
            }
        }
    }

    fn observe_gauge(&mut self, events: &mut Vec<RoundEvent>) {
        if let Some(event) = self.flow.observe_gauge(&self.gauge) {
            events.push(RoundEvent::Flow(event));
        }
    }

    fn ambient_status(&self) -> StatusCode {
        if self.selection.is_empty() {
            StatusCode::Selecting
        } else if self.input.is_empty() {
            StatusCode::Waiting
        } else {
            StatusCode::Inputting
        }
    }

    fn settle_status(&mut self, events: &mut Vec<RoundEvent>) {
        let ambient = self.ambient_status();
        if let Some(event) = self.status.settle(ambient) {
            events.push(event);
        }
    }

    #[doc(hidden)]
    pub fn set_challenge_for_test(&mut self, slot: usize, challenge: Challenge) {
        self.board.set_challenge_for_test(slot, challenge);
    }

    #[doc(hidden)]
    pub fn set_flow_gauge_for_test(&mut self, value: f32) {
        self.gauge.set_for_test(value);
    }
}
