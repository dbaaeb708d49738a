use std::collections::BTreeSet;
use std::time::Duration;

use engine::{GameLogic, HeadlessRunner};
use serde::{Deserialize, Serialize};

use crate::config::RoundConfig;
use crate::error::ConfigError;
use crate::events::RoundEvent;
use crate::flow::FlowState;
use crate::input::Key;
use crate::orchestrator::{Command, FrameInput, Gate, RoundOrchestrator};

/// A round as a frame-steppable game.
#[derive(Debug, Clone)]
pub struct TypingLogic {
    prototype: RoundOrchestrator,
}

impl TypingLogic {
    pub fn new(config: RoundConfig, seed: u64) -> Result<Self, ConfigError> {
        Ok(Self {
            prototype: RoundOrchestrator::new(config, seed)?,
        })
    }

    pub fn from_round(round: RoundOrchestrator) -> Self {
        Self { prototype: round }
    }

    pub fn slot_count(&self) -> usize {
        self.prototype.board().len()
    }
}

impl GameLogic for TypingLogic {
    type State = RoundOrchestrator;
    type Input = FrameInput;
    type Event = RoundEvent;

    fn initial_state(&self) -> Self::State {
        self.prototype.clone()
    }

    fn step(&self, state: &Self::State, input: Self::Input, dt: Duration) -> (Self::State, Vec<Self::Event>) {
        let mut next = state.clone();
        let events = next.tick(dt, &input);
        (next, events)
    }
}

fn one() -> usize {
    1
}

/// One line of a replay script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    Wait {
        secs: f32,
    },
    Click {
        slot: usize,
        #[serde(default)]
        modifier: bool,
    },
    DoubleClick {
        slot: usize,
    },
    Type {
        text: String,
    },
    Backspace {
        #[serde(default = "one")]
        count: usize,
    },
    Submit,
    Chord,
    Pause {
        paused: bool,
    },
    RevealAll,
}

/// Scripted player input, expanded into per-tick frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self { steps }
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Every step except `Wait` takes exactly one frame.
    pub fn frames(&self, tick: Duration, slot_count: usize) -> Vec<FrameInput> {
        let mut frames = Vec::new();
        for step in &self.steps {
            match step {
                ScriptStep::Wait { secs } => {
                    let count = wait_frames(*secs, tick);
                    frames.extend(std::iter::repeat_n(FrameInput::idle(), count));
                }
                ScriptStep::Click { slot, modifier } => frames.push(FrameInput::with_commands([
                    Command::Click {
                        slot: *slot,
                        modifier: *modifier,
                    },
                ])),
                ScriptStep::DoubleClick { slot } => {
                    frames.push(FrameInput::with_commands([Command::DoubleClick { slot: *slot }]))
                }
                ScriptStep::Type { text } => frames.push(FrameInput::with_commands(
                    Key::from_text(text).map(|key| Command::Key { key }),
                )),
                ScriptStep::Backspace { count } => frames.push(FrameInput::with_commands(
                    std::iter::repeat_n(
                        Command::Key {
                            key: Key::Backspace,
                        },
                        *count,
                    ),
                )),
                ScriptStep::Submit => frames.push(FrameInput::with_commands([Command::Submit])),
                ScriptStep::Chord => frames.push(FrameInput {
                    chord_held: true,
                    ..FrameInput::default()
                }),
                ScriptStep::Pause { paused } => frames.push(FrameInput {
                    pause: Some(*paused),
                    ..FrameInput::default()
                }),
                ScriptStep::RevealAll => frames.push(FrameInput::with_commands(
                    (0..slot_count).map(|slot| Command::RevealFinished { slot }),
                )),
            }
        }
        frames
    }
}

fn wait_frames(secs: f32, tick: Duration) -> usize {
    if !secs.is_finite() || secs <= 0.0 || tick.is_zero() {
        return 0;
    }
    (secs / tick.as_secs_f32()).ceil() as usize
}

/// Deterministic bot: selects the first open slot (optionally adding every
/// compatible one), types a plan that satisfies the whole selection, and
/// submits. It also dismisses interference, arms flow mode, and pays out
/// flow records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoPlayer {
    pub letters_per_tick: usize,
    pub combine: bool,
}

impl Default for AutoPlayer {
    fn default() -> Self {
        Self {
            letters_per_tick: 1,
            combine: true,
        }
    }
}

impl AutoPlayer {
    pub fn next_input(&self, round: &RoundOrchestrator) -> FrameInput {
        match round.gate() {
            Gate::TimeUp | Gate::Paused => return FrameInput::idle(),
            Gate::Blocked => return FrameInput::with_commands([Command::Submit]),
            Gate::Open => {}
        }
        match round.flow().state() {
            FlowState::CanActivate => {
                return FrameInput {
                    chord_held: true,
                    ..FrameInput::default()
                };
            }
            FlowState::SendPending => return FrameInput::with_commands([Command::Submit]),
            FlowState::Normal | FlowState::Active => {}
        }

        if round.selection().is_empty() {
            return Self::select(round, self.combine);
        }
        let Some(plan) = Self::plan(round) else {
            // The combined keys overflow the shared window; go single.
            return Self::select(round, false);
        };

        let typed = round.input().letters();
        if !plan.starts_with(typed) {
            let commands = std::iter::repeat_n(
                Command::Key {
                    key: Key::Backspace,
                },
                typed.len(),
            );
            return FrameInput::with_commands(commands);
        }
        if typed.len() < plan.len() {
            let commands = plan[typed.len()..]
                .iter()
                .take(self.letters_per_tick.max(1))
                .map(|&letter| Command::Key {
                    key: Key::Letter(letter),
                });
            return FrameInput::with_commands(commands);
        }
        if round.flow().state() == FlowState::Active {
            return FrameInput::idle();
        }
        FrameInput::with_commands([Command::Submit])
    }

    /// Steps `runner` for `frames` ticks; returns the final frame number.
    pub fn play(&self, runner: &mut HeadlessRunner<TypingLogic>, frames: usize) -> usize {
        for _ in 0..frames {
            let input = self.next_input(runner.state());
            runner.step(input);
        }
        runner.frame()
    }

    fn select(round: &RoundOrchestrator, combine: bool) -> FrameInput {
        let board = round.board();
        let Some(first) = (0..board.len()).find(|&i| board.is_selectable(i)) else {
            return FrameInput::idle();
        };
        let mut commands = vec![Command::Click {
            slot: first,
            modifier: false,
        }];
        if combine {
            commands.extend(
                (first + 1..board.len())
                    .filter(|&i| board.is_selectable(i))
                    .map(|slot| Command::Click {
                        slot,
                        modifier: true,
                    }),
            );
        }
        FrameInput::with_commands(commands)
    }

    /// Letters that satisfy every selected challenge: the required keys,
    /// padded with filler up to the window's minimum.
    fn plan(round: &RoundOrchestrator) -> Option<Vec<char>> {
        let window = round.selection().intersection(round.board());
        let keys: BTreeSet<char> = round
            .selection()
            .challenges(round.board())
            .iter()
            .flat_map(|c| c.required_keys().iter().copied())
            .collect();
        let len = window.min.max(keys.len());
        if len > window.max {
            return None;
        }
        let mut plan: Vec<char> = keys.into_iter().collect();
        plan.resize(len, 'X');
        Some(plan)
    }
}
