use std::fmt;
use std::time::Duration;

use engine::timer::Countdown;
use serde::{Deserialize, Serialize};

use crate::challenge::Challenge;
use crate::flow::FlowEvent;
use crate::interference::InterferenceEvent;
use crate::selection::RangeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Selecting,
    Waiting,
    Inputting,
    Success,
    Fail,
    Interference,
    TimeUp,
    SimulRejected,
}

impl StatusCode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Selecting => "SELECT A CHALLENGE",
            Self::Waiting => "WAITING FOR INPUT",
            Self::Inputting => "INPUTTING",
            Self::Success => "SUCCESS",
            Self::Fail => "FAILED",
            Self::Interference => "INTERFERENCE",
            Self::TimeUp => "TIME UP",
            Self::SimulRejected => "CANNOT COMBINE",
        }
    }
}

/// Everything the round tells presentation and audio about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    SelectionChanged {
        selected: Vec<usize>,
        window: RangeWindow,
    },
    Status {
        code: StatusCode,
        hold_secs: f32,
    },
    ChallengeReplaced {
        slot: usize,
        challenge: Challenge,
        reveal_secs: f32,
    },
    Damage {
        amount: f32,
        target: Option<usize>,
        suppression: f32,
    },
    FlowDelta {
        amount: f32,
    },
    EnemySuppressed {
        target: usize,
    },
    EnemiesCleared,
    Flow(FlowEvent),
    Interference(InterferenceEvent),
    TimeUp,
}

impl fmt::Display for RoundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectionChanged { selected, window } => {
                write!(f, "selection {selected:?} window {window}")
            }
            Self::Status { code, hold_secs } if *hold_secs > 0.0 => {
                write!(f, "status {} ({hold_secs:.2}s)", code.label())
            }
            Self::Status { code, .. } => write!(f, "status {}", code.label()),
            Self::ChallengeReplaced { slot, challenge, .. } => {
                write!(f, "slot {slot} -> {challenge}")
            }
            Self::Damage {
                amount,
                target: Some(target),
                suppression,
            } => write!(f, "damage {amount:.1} to enemy {target} ({suppression:.0}% suppressed)"),
            Self::Damage { amount, .. } => write!(f, "damage {amount:.1} (no target)"),
            Self::FlowDelta { amount } => write!(f, "flow {amount:+.1}"),
            Self::EnemySuppressed { target } => write!(f, "enemy {target} suppressed"),
            Self::EnemiesCleared => f.write_str("all enemies suppressed"),
            Self::Flow(event) => write!(f, "flow mode {event:?}"),
            Self::Interference(InterferenceEvent::Started { name, .. }) => {
                write!(f, "interference {name} started")
            }
            Self::Interference(InterferenceEvent::Ended { name }) => {
                write!(f, "interference {name} ended")
            }
            Self::TimeUp => f.write_str("time up"),
        }
    }
}

/// Current status line. Feedback statuses are held for a while before the
/// ambient one (Selecting / Waiting / Inputting) comes back, and ambient
/// statuses are only reported when they change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusBoard {
    current: StatusCode,
    hold: Option<Countdown>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            current: StatusCode::Selecting,
            hold: None,
        }
    }
}

impl StatusBoard {
    pub fn current(&self) -> StatusCode {
        self.current
    }

    pub fn is_holding(&self) -> bool {
        self.hold.is_some()
    }

    /// Shows `code` for at least `hold`, overriding any earlier hold.
    pub fn force(&mut self, code: StatusCode, hold: Duration) -> RoundEvent {
        self.current = code;
        self.hold = (!hold.is_zero()).then(|| Countdown::new(hold));
        RoundEvent::Status {
            code,
            hold_secs: hold.as_secs_f32(),
        }
    }

    /// Shows `code` until the next ambient change.
    pub fn show(&mut self, code: StatusCode) -> RoundEvent {
        self.force(code, Duration::ZERO)
    }

    pub fn tick(&mut self, dt: Duration) {
        if let Some(hold) = &mut self.hold {
            if hold.tick(dt) {
                self.hold = None;
            }
        }
    }

    pub fn settle(&mut self, ambient: StatusCode) -> Option<RoundEvent> {
        if self.hold.is_some() || self.current == ambient {
            return None;
        }
        Some(self.show(ambient))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Synchronous listener for round events. Implement only the hooks you need;
/// `on_event` routes each event to them.
pub trait RoundObserver {
    fn on_selection_changed(&mut self, _selected: &[usize], _window: RangeWindow) {}
    fn on_status(&mut self, _code: StatusCode, _hold_secs: f32) {}
    fn on_challenge_replaced(&mut self, _slot: usize, _challenge: &Challenge) {}
    fn on_damage(&mut self, _amount: f32) {}
    fn on_flow_delta(&mut self, _amount: f32) {}
    fn on_other(&mut self, _event: &RoundEvent) {}

    fn on_event(&mut self, event: &RoundEvent) {
        match event {
            RoundEvent::SelectionChanged { selected, window } => {
                self.on_selection_changed(selected, *window)
            }
            RoundEvent::Status { code, hold_secs } => self.on_status(*code, *hold_secs),
            RoundEvent::ChallengeReplaced {
                slot, challenge, ..
            } => self.on_challenge_replaced(*slot, challenge),
            RoundEvent::Damage { amount, .. } => self.on_damage(*amount),
            RoundEvent::FlowDelta { amount } => self.on_flow_delta(*amount),
            other => self.on_other(other),
        }
    }
}

/// Observers notified in registration order.
#[derive(Default)]
pub struct ObserverList {
    observers: Vec<Box<dyn RoundObserver>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn RoundObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn dispatch<'a>(&mut self, events: impl IntoIterator<Item = &'a RoundEvent>) {
        for event in events {
            for observer in &mut self.observers {
                observer.on_event(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn held_status_blocks_ambient_until_expiry() {
        let mut board = StatusBoard::default();
        assert_eq!(board.settle(StatusCode::Selecting), None);

        board.force(StatusCode::Success, Duration::from_secs(1));
        assert_eq!(board.settle(StatusCode::Waiting), None);
        board.tick(Duration::from_millis(600));
        assert_eq!(board.settle(StatusCode::Waiting), None);
        board.tick(Duration::from_millis(400));
        assert_eq!(
            board.settle(StatusCode::Waiting),
            Some(RoundEvent::Status {
                code: StatusCode::Waiting,
                hold_secs: 0.0
            })
        );
        assert_eq!(board.settle(StatusCode::Waiting), None);
    }

    struct Recorder {
        tag: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl RoundObserver for Recorder {
        fn on_damage(&mut self, amount: f32) {
            self.log.borrow_mut().push(format!("{}:{amount}", self.tag));
        }
    }

    #[test]
    fn observers_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut list = ObserverList::new();
        list.register(Box::new(Recorder { tag: "a", log: Rc::clone(&log) }));
        list.register(Box::new(Recorder { tag: "b", log: Rc::clone(&log) }));

        let events = [
            RoundEvent::Damage {
                amount: 5.0,
                target: Some(0),
                suppression: 5.0,
            },
            RoundEvent::TimeUp,
        ];
        list.dispatch(&events);
        assert_eq!(*log.borrow(), vec!["a:5".to_string(), "b:5".to_string()]);
    }
}
