use std::time::Duration;

use engine::tween::Tween;

use crate::challenge::{Challenge, ChallengeFactory};

/// One challenge position plus its reveal curtain.
///
/// The curtain runs from 1.0 (covered) down to 0.0. A slot is selectable only
/// once the curtain is fully open, either by the tween running out or by the
/// presentation layer reporting the animation as done.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeSlot {
    challenge: Challenge,
    reveal: Tween,
}

impl ChallengeSlot {
    fn revealing(challenge: Challenge, duration: Duration) -> Self {
        Self {
            challenge,
            reveal: Tween::new(1.0, 0.0, duration),
        }
    }

    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    pub fn is_revealing(&self) -> bool {
        !self.reveal.is_finished()
    }

    /// 1.0 while covered, 0.0 once open.
    pub fn curtain(&self) -> f32 {
        self.reveal.value()
    }
}

/// Fixed-size ordered array of challenge slots.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeBoard {
    slots: Vec<ChallengeSlot>,
    reveal_duration: Duration,
}

impl ChallengeBoard {
    pub fn new(count: usize, reveal_duration: Duration, factory: &mut ChallengeFactory) -> Self {
        let slots = (0..count)
            .map(|_| ChallengeSlot::revealing(factory.create(), reveal_duration))
            .collect();
        Self {
            slots,
            reveal_duration,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChallengeSlot> {
        self.slots.get(index)
    }

    pub fn challenge(&self, index: usize) -> Option<&Challenge> {
        self.slots.get(index).map(ChallengeSlot::challenge)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChallengeSlot> {
        self.slots.iter()
    }

    pub fn reveal_duration(&self) -> Duration {
        self.reveal_duration
    }

    /// `false` for revealing slots and for indices past the end.
    pub fn is_selectable(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .is_some_and(|slot| !slot.is_revealing())
    }

    /// Puts a new challenge in the slot and restarts its reveal. An in-flight
    /// reveal is discarded. Returns `false` for an unknown index.
    pub fn replace(&mut self, index: usize, challenge: Challenge) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        *slot = ChallengeSlot::revealing(challenge, self.reveal_duration);
        true
    }

    /// Regenerates every slot.
    pub fn refill(&mut self, factory: &mut ChallengeFactory) {
        for slot in &mut self.slots {
            *slot = ChallengeSlot::revealing(factory.create(), self.reveal_duration);
        }
    }

    /// Returns `true` if the slot was still revealing.
    pub fn finish_reveal(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_revealing() => {
                slot.reveal.finish();
                true
            }
            _ => false,
        }
    }

    pub fn finish_all_reveals(&mut self) {
        for slot in &mut self.slots {
            slot.reveal.finish();
        }
    }

    /// Advances every curtain; returns the slots that opened on this tick.
    pub fn tick(&mut self, dt: Duration) -> Vec<usize> {
        let mut opened = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_revealing() {
                slot.reveal.advance(dt);
                if !slot.is_revealing() {
                    opened.push(index);
                }
            }
        }
        opened
    }

    #[doc(hidden)]
    pub fn set_challenge_for_test(&mut self, index: usize, challenge: Challenge) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = ChallengeSlot {
                challenge,
                reveal: Tween::settled(0.0),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::ChallengeSpec;

    fn board() -> ChallengeBoard {
        let mut factory = ChallengeFactory::new(ChallengeSpec::default(), 3);
        ChallengeBoard::new(4, Duration::from_millis(300), &mut factory)
    }

    #[test]
    fn slots_open_after_reveal_duration() {
        let mut b = board();
        assert!((0..4).all(|i| !b.is_selectable(i)));

        assert!(b.tick(Duration::from_millis(200)).is_empty());
        assert_eq!(b.tick(Duration::from_millis(100)), vec![0, 1, 2, 3]);
        assert!((0..4).all(|i| b.is_selectable(i)));
        assert!(b.tick(Duration::from_millis(100)).is_empty());
    }

    #[test]
    fn replace_restarts_reveal_for_that_slot_only() {
        let mut b = board();
        b.finish_all_reveals();
        let fresh = Challenge::new(3, 5, []).expect("valid challenge");
        assert!(b.replace(2, fresh.clone()));
        assert!(!b.is_selectable(2));
        assert!(b.is_selectable(1));
        assert_eq!(b.challenge(2), Some(&fresh));
        assert!(!b.replace(9, fresh));
    }

    #[test]
    fn finish_reveal_reports_only_real_transitions() {
        let mut b = board();
        assert!(b.finish_reveal(0));
        assert!(!b.finish_reveal(0));
        assert!(!b.finish_reveal(42));
        assert!(!b.is_selectable(42));
    }
}
