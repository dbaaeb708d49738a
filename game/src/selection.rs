use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::ChallengeBoard;
use crate::challenge::Challenge;
use crate::error::SelectionError;

/// Running intersection of the selected count intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeWindow {
    pub min: usize,
    pub max: usize,
}

impl RangeWindow {
    /// Window of the empty selection.
    pub const UNBOUNDED: RangeWindow = RangeWindow {
        min: 0,
        max: usize::MAX,
    };

    pub fn of(challenge: &Challenge) -> Self {
        Self {
            min: challenge.min_count(),
            max: challenge.max_count(),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        *self == Self::UNBOUNDED
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn overlaps(&self, other: &RangeWindow) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    pub fn intersect(&self, other: &RangeWindow) -> RangeWindow {
        RangeWindow {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    pub fn contains(&self, count: usize) -> bool {
        self.min <= count && count <= self.max
    }
}

impl fmt::Display for RangeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            f.write_str("any")
        } else {
            write!(f, "[{}, {}]", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Selected,
    Added,
    Removed,
    Cleared,
}

/// What a successful mutation did. The owner uses the emptiness edges to
/// reset the input buffer and the elapsed-time measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    pub kind: ChangeKind,
    pub was_empty: bool,
    pub now_empty: bool,
}

impl SelectionChange {
    pub fn became_empty(&self) -> bool {
        !self.was_empty && self.now_empty
    }

    pub fn became_non_empty(&self) -> bool {
        self.was_empty && !self.now_empty
    }
}

/// Selected slot indices. Every member is a non-revealing slot and the
/// members' count intervals always share a common point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    members: BTreeSet<usize>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    /// Members in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    /// Replaces the selection with `index` alone.
    pub fn select_single(
        &mut self,
        index: usize,
        board: &ChallengeBoard,
    ) -> Result<SelectionChange, SelectionError> {
        if index >= board.len() {
            return Err(SelectionError::UnknownSlot { index });
        }
        if !board.is_selectable(index) {
            return Err(SelectionError::SlotNotSelectable { index });
        }
        let was_empty = self.is_empty();
        self.members.clear();
        self.members.insert(index);
        Ok(SelectionChange {
            kind: ChangeKind::Selected,
            was_empty,
            now_empty: false,
        })
    }

    /// Removes `index` if present, otherwise adds it when it is revealed and
    /// its interval overlaps the current intersection.
    pub fn toggle(
        &mut self,
        index: usize,
        board: &ChallengeBoard,
    ) -> Result<SelectionChange, SelectionError> {
        let was_empty = self.is_empty();
        if self.members.remove(&index) {
            return Ok(SelectionChange {
                kind: ChangeKind::Removed,
                was_empty,
                now_empty: self.is_empty(),
            });
        }

        let Some(slot) = board.get(index) else {
            return Err(SelectionError::UnknownSlot { index });
        };
        if slot.is_revealing() {
            debug!(index, "toggle rejected: slot still revealing");
            return Err(SelectionError::RejectedReveal { index });
        }
        let window = self.intersection(board);
        if !window.overlaps(&RangeWindow::of(slot.challenge())) {
            debug!(index, %window, "toggle rejected: range conflict");
            return Err(SelectionError::RejectedRangeConflict { index, window });
        }

        self.members.insert(index);
        Ok(SelectionChange {
            kind: ChangeKind::Added,
            was_empty,
            now_empty: false,
        })
    }

    /// Intersection of the members' intervals, starting from the unbounded
    /// window so the empty set admits anything.
    pub fn intersection(&self, board: &ChallengeBoard) -> RangeWindow {
        self.iter()
            .filter_map(|index| board.challenge(index))
            .fold(RangeWindow::UNBOUNDED, |window, challenge| {
                window.intersect(&RangeWindow::of(challenge))
            })
    }

    pub fn clear(&mut self) -> SelectionChange {
        let was_empty = self.is_empty();
        self.members.clear();
        SelectionChange {
            kind: ChangeKind::Cleared,
            was_empty,
            now_empty: true,
        }
    }

    pub fn challenges<'a>(&'a self, board: &'a ChallengeBoard) -> Vec<&'a Challenge> {
        self.iter().filter_map(|index| board.challenge(index)).collect()
    }

    /// Pairwise overlap of every member. Holds after every mutation.
    pub fn is_admissible(&self, board: &ChallengeBoard) -> bool {
        let windows: Vec<RangeWindow> = self
            .challenges(board)
            .into_iter()
            .map(RangeWindow::of)
            .collect();
        windows
            .iter()
            .enumerate()
            .all(|(i, a)| windows[i + 1..].iter().all(|b| a.overlaps(b)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::challenge::{ChallengeFactory, ChallengeSpec};

    fn board_with(ranges: &[(usize, usize)]) -> ChallengeBoard {
        let mut factory = ChallengeFactory::new(ChallengeSpec::default(), 0);
        let mut board = ChallengeBoard::new(ranges.len(), Duration::from_millis(350), &mut factory);
        for (i, &(min, max)) in ranges.iter().enumerate() {
            board.set_challenge_for_test(i, Challenge::new(min, max, []).expect("valid"));
        }
        board
    }

    #[test]
    fn window_display() {
        assert_eq!(RangeWindow::UNBOUNDED.to_string(), "any");
        assert_eq!(RangeWindow { min: 14, max: 15 }.to_string(), "[14, 15]");
    }

    #[test]
    fn select_single_replaces_the_set() {
        let board = board_with(&[(10, 15), (14, 20), (30, 40)]);
        let mut set = SelectionSet::new();
        set.toggle(0, &board).expect("add");
        set.toggle(1, &board).expect("add");

        let change = set.select_single(2, &board).expect("select");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2]);
        assert!(!change.was_empty);
        assert_eq!(
            set.select_single(7, &board),
            Err(SelectionError::UnknownSlot { index: 7 })
        );
    }

    #[test]
    fn removal_reports_becoming_empty() {
        let board = board_with(&[(10, 15)]);
        let mut set = SelectionSet::new();
        assert!(set.toggle(0, &board).expect("add").became_non_empty());
        assert!(set.toggle(0, &board).expect("remove").became_empty());
        assert!(!set.clear().became_empty());
    }
}
