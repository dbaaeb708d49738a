use std::time::Duration;

use typestrike::board::ChallengeBoard;
use typestrike::challenge::{Challenge, ChallengeFactory, ChallengeSpec};
use typestrike::error::SelectionError;
use typestrike::selection::{RangeWindow, SelectionSet};

fn challenge(min: usize, max: usize) -> Challenge {
    Challenge::new(min, max, []).expect("valid challenge")
}

/// Board whose first `ranges.len()` slots are revealed with the given
/// intervals; any extra slots are still revealing.
fn board(ranges: &[(usize, usize)], extra_revealing: usize) -> ChallengeBoard {
    let mut factory = ChallengeFactory::new(ChallengeSpec::default(), 11);
    let mut board = ChallengeBoard::new(
        ranges.len() + extra_revealing,
        Duration::from_millis(350),
        &mut factory,
    );
    for (i, &(min, max)) in ranges.iter().enumerate() {
        board.set_challenge_for_test(i, challenge(min, max));
    }
    board
}

#[test]
fn third_challenge_outside_intersection_is_rejected() {
    let board = board(&[(10, 15), (14, 20), (5, 13)], 0);
    let mut set = SelectionSet::new();

    set.toggle(0, &board).expect("first member is always admitted");
    set.toggle(1, &board).expect("[14,20] overlaps [10,15]");
    assert_eq!(set.intersection(&board), RangeWindow { min: 14, max: 15 });

    assert_eq!(
        set.toggle(2, &board),
        Err(SelectionError::RejectedRangeConflict {
            index: 2,
            window: RangeWindow { min: 14, max: 15 },
        })
    );
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn admission_uses_running_intersection_not_any_member() {
    // [5,13] overlaps [10,15] on its own, but not the joint window [14,15].
    let board = board(&[(14, 20), (10, 15), (5, 13)], 0);
    let mut set = SelectionSet::new();
    set.toggle(0, &board).expect("add");
    set.toggle(1, &board).expect("add");
    assert!(matches!(
        set.toggle(2, &board),
        Err(SelectionError::RejectedRangeConflict { index: 2, .. })
    ));
    assert!(set.is_admissible(&board));
}

#[test]
fn revealing_slot_cannot_join_or_be_selected() {
    let board = board(&[(10, 15)], 1);
    let mut set = SelectionSet::new();
    set.toggle(0, &board).expect("add");

    assert_eq!(
        set.toggle(1, &board),
        Err(SelectionError::RejectedReveal { index: 1 })
    );
    assert_eq!(
        set.select_single(1, &board),
        Err(SelectionError::SlotNotSelectable { index: 1 })
    );
    assert_eq!(set.len(), 1);
}

#[test]
fn removal_is_always_legal() {
    let board = board(&[(10, 15), (12, 18)], 0);
    let mut set = SelectionSet::new();
    set.toggle(0, &board).expect("add");
    set.toggle(1, &board).expect("add");

    let change = set.toggle(0, &board).expect("remove");
    assert!(!change.became_empty());
    assert_eq!(set.intersection(&board), RangeWindow { min: 12, max: 18 });
}

#[test]
fn empty_selection_intersection_is_unbounded() {
    let board = board(&[(10, 15)], 0);
    let set = SelectionSet::new();
    assert_eq!(set.intersection(&board), RangeWindow::UNBOUNDED);
    assert!(set.challenges(&board).is_empty());
}

#[test]
fn touching_intervals_overlap() {
    let board = board(&[(10, 14), (14, 20)], 0);
    let mut set = SelectionSet::new();
    set.toggle(0, &board).expect("add");
    set.toggle(1, &board).expect("[14,20] touches [10,14]");
    assert_eq!(set.intersection(&board), RangeWindow { min: 14, max: 14 });
}

#[test]
fn unknown_slot_is_reported() {
    let board = board(&[(10, 15)], 0);
    let mut set = SelectionSet::new();
    assert_eq!(
        set.toggle(9, &board),
        Err(SelectionError::UnknownSlot { index: 9 })
    );
    assert_eq!(SelectionError::UnknownSlot { index: 9 }.index(), 9);
}
