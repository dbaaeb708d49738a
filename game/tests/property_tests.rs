use std::collections::BTreeSet;
use std::time::Duration;

use proptest::prelude::*;
use typestrike::board::ChallengeBoard;
use typestrike::challenge::{Challenge, ChallengeFactory, ChallengeSpec, MAX_REQUIRED_KEYS};
use typestrike::judge::{TimeCurve, simultaneous_multiplier, time_multiplier};
use typestrike::selection::{RangeWindow, SelectionSet};

fn generation_ranges() -> impl Strategy<Value = ChallengeSpec> {
    (0usize..15, 0usize..10, 0usize..5, 0usize..5, 0usize..=MAX_REQUIRED_KEYS).prop_map(
        |(min_low, min_extra, span_low, span_extra, keys)| ChallengeSpec {
            min_count_low: min_low,
            min_count_high: min_low + min_extra,
            span_low,
            span_high: span_low + span_extra,
            max_required_keys: keys.min(min_low + span_low),
        },
    )
}

proptest! {
    #[test]
    fn generated_challenges_stay_within_generation_ranges(
        spec in generation_ranges(),
        seed in any::<u64>(),
        relaxed in any::<bool>(),
    ) {
        prop_assert!(spec.validate().is_ok());
        let mut factory = ChallengeFactory::new(spec, seed);
        factory.set_relaxed(relaxed);
        for _ in 0..16 {
            let challenge = factory.create();
            prop_assert!(challenge.validate().is_ok());
            prop_assert!((spec.min_count_low..=spec.min_count_high).contains(&challenge.min_count()));
            let span = challenge.max_count() - challenge.min_count();
            prop_assert!((spec.span_low..=spec.span_high).contains(&span));

            let keys = challenge.required_keys();
            prop_assert!(keys.len() <= spec.max_required_keys);
            prop_assert!(keys.len() <= challenge.max_count(), "every key must fit: {}", challenge);
            prop_assert!(keys.iter().all(char::is_ascii_uppercase));
            let distinct: BTreeSet<_> = keys.iter().collect();
            prop_assert_eq!(distinct.len(), keys.len());
            if relaxed {
                prop_assert!(keys.is_empty());
            }
        }
    }

    #[test]
    fn toggling_never_admits_disjoint_ranges(
        seed in any::<u64>(),
        ranges in prop::collection::vec((0usize..30, 0usize..8), 2..8),
        clicks in prop::collection::vec(0usize..10, 0..40),
    ) {
        let mut factory = ChallengeFactory::new(ChallengeSpec::default(), seed);
        let mut board = ChallengeBoard::new(ranges.len(), Duration::from_millis(350), &mut factory);
        for (i, &(min, span)) in ranges.iter().enumerate() {
            let challenge = Challenge::new(min, min + span, []).expect("valid challenge");
            board.set_challenge_for_test(i, challenge);
        }

        let mut set = SelectionSet::new();
        for slot in clicks {
            let before = set.clone();
            if set.toggle(slot, &board).is_err() {
                prop_assert_eq!(&set, &before, "rejected toggles leave the set untouched");
            }
            prop_assert!(set.is_admissible(&board));
            let window = set.intersection(&board);
            prop_assert!(set.is_empty() || !window.is_empty());
            prop_assert_eq!(set.is_empty(), window == RangeWindow::UNBOUNDED);
        }
    }

    #[test]
    fn simultaneous_multiplier_stays_in_bounds(
        selected in 0usize..64,
        per_extra in 0.0f32..2.0,
        cap in 0.0f32..10.0,
    ) {
        let mul = simultaneous_multiplier(selected, per_extra, cap);
        prop_assert!(mul >= 1.0);
        prop_assert!(mul <= cap.max(1.0) + 1e-4);
        if selected <= 1 {
            prop_assert_eq!(mul, 1.0);
        }
    }

    #[test]
    fn time_multiplier_is_monotone_and_clamped(a_ms in 0u64..20_000, b_ms in 0u64..20_000) {
        let curve = TimeCurve::default();
        let (early, late) = (a_ms.min(b_ms), a_ms.max(b_ms));
        let fast = time_multiplier(Duration::from_millis(early), &curve);
        let slow = time_multiplier(Duration::from_millis(late), &curve);
        prop_assert!(fast + 1e-5 >= slow);
        for mul in [fast, slow] {
            prop_assert!(mul >= curve.min_mul - 1e-5 && mul <= curve.max_mul + 1e-5);
        }
    }
}
