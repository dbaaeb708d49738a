use std::time::Duration;

use typestrike::challenge::Challenge;
use typestrike::input::{InputBuffer, Key};
use typestrike::judge::{
    ScoringConfig, TimeCurve, is_sendable, is_sendable_for_set, reward, simultaneous_multiplier,
    time_multiplier,
};

fn typed(text: &str) -> InputBuffer {
    let mut input = InputBuffer::new();
    input.set_accepting(true);
    for key in Key::from_text(text) {
        input.apply(key);
    }
    input
}

#[test]
fn count_and_required_keys_must_both_hold() {
    let challenge = Challenge::new(10, 15, ['A', 'K']).expect("valid challenge");

    assert!(is_sendable(&challenge, &typed("AKXXXXXXXXXX")));
    assert!(!is_sendable(&challenge, &typed("AKXXXXXXX")), "9 letters is below min");
    assert!(!is_sendable(&challenge, &typed("AXXXXXXXXXXX")), "K is missing");
    assert!(!is_sendable(&challenge, &typed("AKXXXXXXXXXXXXXX")), "16 letters is above max");
}

#[test]
fn required_keys_match_case_insensitively() {
    let challenge = Challenge::new(3, 5, ['q']).expect("valid challenge");
    assert!(is_sendable(&challenge, &typed("xxq")));
}

#[test]
fn zero_minimum_accepts_empty_input() {
    let challenge = Challenge::new(0, 4, []).expect("valid challenge");
    assert!(is_sendable(&challenge, &InputBuffer::new()));
}

#[test]
fn set_judgment_is_all_or_nothing() {
    let a = Challenge::new(10, 15, ['A']).expect("valid challenge");
    let b = Challenge::new(10, 15, ['Z']).expect("valid challenge");
    let input = typed("AXXXXXXXXXXX");

    assert!(is_sendable_for_set(&[&a], &input));
    assert!(!is_sendable_for_set(&[&a, &b], &input));
    assert!(!is_sendable_for_set(&[], &input), "empty selection is never sendable");
}

#[test]
fn simultaneous_multiplier_boundaries() {
    assert_eq!(simultaneous_multiplier(1, 0.25, 5.0), 1.0);
    assert_eq!(simultaneous_multiplier(0, 0.25, 5.0), 1.0);
    assert_eq!(simultaneous_multiplier(3, 0.25, 5.0), 1.5);
    assert_eq!(simultaneous_multiplier(100, 0.25, 5.0), 5.0);
    // A cap below one never shrinks the reward.
    assert_eq!(simultaneous_multiplier(4, 0.25, 0.5), 1.0);
}

#[test]
fn time_multiplier_clamps_outside_thresholds() {
    let curve = TimeCurve::default();
    assert_eq!(time_multiplier(Duration::ZERO, &curve), 2.0);
    assert_eq!(time_multiplier(Duration::from_secs(2), &curve), 2.0);
    assert_eq!(time_multiplier(Duration::from_secs(8), &curve), 0.5);
    assert_eq!(time_multiplier(Duration::from_secs(60), &curve), 0.5);
}

#[test]
fn reward_multiplies_time_and_selection_bonuses() {
    let scoring = ScoringConfig::default();
    let r = reward(&scoring, Duration::from_secs(5), 2, 14, 14);
    assert_eq!(r.time_mul, 1.25);
    assert_eq!(r.damage_simul_mul, 1.25);
    assert_eq!(r.overflow_mul, 1.0);
    assert!((r.damage - 10.0 * 1.25 * 1.25).abs() < 1e-4);
    assert!((r.flow_gain - 10.0 * 1.25 * 1.25).abs() < 1e-4);
}
