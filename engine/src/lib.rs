pub mod pause;
pub mod timer;
pub mod tween;

use std::collections::VecDeque;
use std::time::Duration;

/// Frame history with rewind/branch support.
///
/// Frame numbers are absolute: when a retention limit drops the oldest
/// states, `frame()` keeps counting from the start of the run.
#[derive(Debug, Clone)]
pub struct TimeMachine<State> {
    states: VecDeque<State>,
    first_frame: usize,
    frame: usize,
    limit: Option<usize>,
}

impl<State> TimeMachine<State> {
    pub fn new(initial_state: State) -> Self {
        let mut states = VecDeque::new();
        states.push_back(initial_state);
        Self {
            states,
            first_frame: 0,
            frame: 0,
            limit: None,
        }
    }

    /// Keep at most `limit` states (minimum 1).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.max(1));
        self.enforce_limit();
        self
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn first_frame(&self) -> usize {
        self.first_frame
    }

    pub fn last_frame(&self) -> usize {
        self.first_frame + self.states.len() - 1
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self) -> &State {
        &self.states[self.frame - self.first_frame]
    }

    pub fn state_at(&self, frame: usize) -> Option<&State> {
        frame
            .checked_sub(self.first_frame)
            .and_then(|idx| self.states.get(idx))
    }

    pub fn history(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub fn can_rewind(&self) -> bool {
        self.frame > self.first_frame
    }

    pub fn can_forward(&self) -> bool {
        self.frame < self.last_frame()
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.frame = self.frame.saturating_sub(frames).max(self.first_frame);
        self.frame
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        self.frame = (self.frame + frames).min(self.last_frame());
        self.frame
    }

    /// Appends `state` after the current frame, discarding any frames that
    /// were ahead of it (a rewind followed by a record branches history).
    pub fn record(&mut self, state: State) -> usize {
        let keep = self.frame - self.first_frame + 1;
        self.states.truncate(keep);
        self.states.push_back(state);
        self.frame += 1;
        self.enforce_limit();
        self.frame
    }

    fn enforce_limit(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        while self.states.len() > limit {
            self.states.pop_front();
            self.first_frame += 1;
        }
        self.frame = self.frame.max(self.first_frame);
    }
}

/// Deterministic per-frame game rules.
///
/// `step` is pure with respect to `state`: it returns the next state plus
/// whatever events the transition produced, leaving dispatch to the caller.
pub trait GameLogic {
    type State;
    type Input;
    type Event;

    fn initial_state(&self) -> Self::State;
    fn step(
        &self,
        state: &Self::State,
        input: Self::Input,
        dt: Duration,
    ) -> (Self::State, Vec<Self::Event>);
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameEvent<E> {
    pub frame: usize,
    pub event: E,
}

/// Fixed-tick driver that records every state it produces.
#[derive(Debug)]
pub struct HeadlessRunner<G: GameLogic> {
    game: G,
    tick: Duration,
    timemachine: TimeMachine<G::State>,
    events: Vec<FrameEvent<G::Event>>,
}

impl<G: GameLogic> HeadlessRunner<G> {
    pub fn new(game: G, tick: Duration) -> Self {
        let initial_state = game.initial_state();
        Self {
            game,
            tick,
            timemachine: TimeMachine::new(initial_state),
            events: Vec::new(),
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.timemachine = self.timemachine.with_limit(limit);
        self
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn frame(&self) -> usize {
        self.timemachine.frame()
    }

    /// Simulated time at the current frame.
    pub fn elapsed(&self) -> Duration {
        self.tick
            .saturating_mul(u32::try_from(self.frame()).unwrap_or(u32::MAX))
    }

    pub fn state(&self) -> &G::State {
        self.timemachine.state()
    }

    pub fn timemachine(&self) -> &TimeMachine<G::State> {
        &self.timemachine
    }

    /// Events produced up to and including the current frame.
    pub fn events(&self) -> &[FrameEvent<G::Event>] {
        let frame = self.frame();
        let end = self.events.partition_point(|e| e.frame <= frame);
        &self.events[..end]
    }

    /// Advances one tick and returns the events of that frame.
    pub fn step(&mut self, input: G::Input) -> &[FrameEvent<G::Event>] {
        let (next_state, events) = self.game.step(self.timemachine.state(), input, self.tick);
        let current = self.frame();
        self.events.retain(|e| e.frame <= current);
        let frame = self.timemachine.record(next_state);
        // Events of frames the history limit dropped go with their states.
        let first = self.timemachine.first_frame();
        let expired = self.events.partition_point(|e| e.frame < first);
        self.events.drain(..expired);
        let start = self.events.len();
        self.events
            .extend(events.into_iter().map(|event| FrameEvent { frame, event }));
        tracing::trace!(frame, produced = self.events.len() - start, "stepped");
        &self.events[start..]
    }

    pub fn run<I>(&mut self, inputs: I) -> usize
    where
        I: IntoIterator<Item = G::Input>,
    {
        for input in inputs {
            self.step(input);
        }
        self.frame()
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.timemachine.rewind(frames)
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        self.timemachine.forward(frames)
    }
}
