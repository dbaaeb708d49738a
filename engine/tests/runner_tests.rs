use std::time::Duration;

use engine::pause::PauseContext;
use engine::timer::Countdown;
use engine::{GameLogic, HeadlessRunner};

const TICK: Duration = Duration::from_millis(100);

/// Counts down while unpaused and reports the expiry frame once.
struct Fuse {
    length: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FuseState {
    countdown: Countdown,
    pause: PauseContext,
}

impl GameLogic for Fuse {
    type State = FuseState;
    type Input = Option<bool>;
    type Event = &'static str;

    fn initial_state(&self) -> FuseState {
        FuseState {
            countdown: Countdown::new(self.length),
            pause: PauseContext::RUNNING,
        }
    }

    fn step(&self, state: &FuseState, input: Option<bool>, dt: Duration) -> (FuseState, Vec<&'static str>) {
        let mut next = *state;
        if let Some(paused) = input {
            next.pause.set_paused(paused);
        }
        let mut events = Vec::new();
        if !next.pause.is_paused() && next.countdown.tick(dt) {
            events.push("expired");
        }
        (next, events)
    }
}

#[test]
fn pause_freezes_countdown_and_expiry_fires_once() {
    let mut runner = HeadlessRunner::new(
        Fuse {
            length: Duration::from_millis(300),
        },
        TICK,
    );

    runner.run([None, Some(true), None, None, Some(false), None, None, None]);

    let expired: Vec<usize> = runner.events().iter().map(|e| e.frame).collect();
    assert_eq!(expired, vec![6]);
    assert!(runner.state().countdown.is_finished());
}

#[test]
fn history_limit_keeps_absolute_frames_and_branches() {
    let mut runner = HeadlessRunner::new(
        Fuse {
            length: Duration::from_secs(1),
        },
        TICK,
    )
    .with_history_limit(4);

    runner.run(std::iter::repeat_n(None, 12));
    assert_eq!(runner.frame(), 12);
    assert_eq!(runner.timemachine().first_frame(), 9);
    assert_eq!(runner.events().len(), 1);

    assert_eq!(runner.rewind(100), 9);
    assert!(runner.events().is_empty(), "expiry at frame 10 is ahead of us");

    runner.step(Some(true));
    assert_eq!(runner.frame(), 10);
    assert!(runner.events().is_empty(), "branching drops the old future");

    runner.run([Some(false)]);
    assert_eq!(runner.events().len(), 1);
    assert_eq!(runner.events()[0].frame, 11);
}

/// Emits the new frame count on every step.
struct Ticker;

impl GameLogic for Ticker {
    type State = u32;
    type Input = ();
    type Event = u32;

    fn initial_state(&self) -> u32 {
        0
    }

    fn step(&self, state: &u32, _input: (), _dt: Duration) -> (u32, Vec<u32>) {
        (state + 1, vec![state + 1])
    }
}

#[test]
fn history_limit_also_bounds_the_event_log() {
    let mut runner = HeadlessRunner::new(Ticker, TICK).with_history_limit(4);
    runner.run(std::iter::repeat_n((), 1000));

    let first = runner.timemachine().first_frame();
    assert_eq!(first, 997);
    assert_eq!(runner.events().len(), 4);
    assert_eq!(runner.events()[0].frame, first);
    assert!(
        runner
            .events()
            .iter()
            .all(|e| runner.timemachine().state_at(e.frame).is_some())
    );
}
