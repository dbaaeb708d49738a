//! Submission judgment and reward formulas. Everything here is a pure
//! function of its arguments.

use std::time::Duration;

use engine::tween::{inverse_lerp, lerp};
use serde::{Deserialize, Serialize};

use crate::challenge::Challenge;
use crate::error::ConfigError;
use crate::input::InputBuffer;

pub fn is_sendable(challenge: &Challenge, input: &InputBuffer) -> bool {
    challenge.accepts_count(input.len()) && input.contains_all(challenge.required_keys())
}

/// All-or-nothing over the selection. An empty selection is never sendable.
pub fn is_sendable_for_set(challenges: &[&Challenge], input: &InputBuffer) -> bool {
    !challenges.is_empty() && challenges.iter().all(|c| is_sendable(c, input))
}

/// Reward curve over the time spent typing: `max_mul` at or below `fast`,
/// `min_mul` at or above `slow`, linear in between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeCurve {
    #[serde(with = "crate::serde_secs")]
    pub fast: Duration,
    #[serde(with = "crate::serde_secs")]
    pub slow: Duration,
    pub min_mul: f32,
    pub max_mul: f32,
}

impl Default for TimeCurve {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(2),
            slow: Duration::from_secs(8),
            min_mul: 0.5,
            max_mul: 2.0,
        }
    }
}

impl TimeCurve {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fast.is_zero() {
            return Err(ConfigError::NonPositive {
                field: "scoring.time_curve.fast",
            });
        }
        if self.slow <= self.fast {
            return Err(ConfigError::InvertedRange {
                field: "scoring.time_curve",
                low: self.fast.as_secs_f64(),
                high: self.slow.as_secs_f64(),
            });
        }
        check_amount("scoring.time_curve.min_mul", self.min_mul)?;
        check_amount("scoring.time_curve.max_mul", self.max_mul)?;
        if self.min_mul > self.max_mul {
            return Err(ConfigError::InvertedRange {
                field: "scoring.time_curve.multiplier",
                low: f64::from(self.min_mul),
                high: f64::from(self.max_mul),
            });
        }
        Ok(())
    }
}

pub fn time_multiplier(elapsed: Duration, curve: &TimeCurve) -> f32 {
    let t = inverse_lerp(
        curve.slow.as_secs_f32(),
        curve.fast.as_secs_f32(),
        elapsed.as_secs_f32(),
    );
    lerp(curve.min_mul, curve.max_mul, t)
}

/// Linear bonus per item beyond the first, capped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepBonus {
    pub per_extra: f32,
    pub cap: f32,
}

impl StepBonus {
    pub const fn new(per_extra: f32, cap: f32) -> Self {
        Self { per_extra, cap }
    }

    fn validate(&self, per_extra_field: &'static str, cap_field: &'static str) -> Result<(), ConfigError> {
        check_amount(per_extra_field, self.per_extra)?;
        check_amount(cap_field, self.cap)
    }
}

pub fn simultaneous_multiplier(selected: usize, per_extra: f32, cap: f32) -> f32 {
    let extra = selected.saturating_sub(1) as f32;
    (1.0 + extra * per_extra).min(cap.max(1.0))
}

/// Bonus for letters typed beyond the required minimum.
pub fn overflow_multiplier(typed: usize, required_min: usize, per_letter: f32, cap: f32) -> f32 {
    let extra = typed.saturating_sub(required_min) as f32;
    (1.0 + extra * per_letter).min(cap.max(1.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_damage: f32,
    pub flow_gain: f32,
    pub flow_loss: f32,
    /// When off, every submission scores as if typed instantly.
    pub start_timer_on_select: bool,
    pub time_curve: TimeCurve,
    pub damage_bonus: StepBonus,
    pub flow_bonus: StepBonus,
    pub overflow_bonus: StepBonus,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_damage: 10.0,
            flow_gain: 10.0,
            flow_loss: 5.0,
            start_timer_on_select: true,
            time_curve: TimeCurve::default(),
            damage_bonus: StepBonus::new(0.25, 5.0),
            flow_bonus: StepBonus::new(0.25, 5.0),
            overflow_bonus: StepBonus::new(0.0, 3.0),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_amount("scoring.base_damage", self.base_damage)?;
        check_amount("scoring.flow_gain", self.flow_gain)?;
        check_amount("scoring.flow_loss", self.flow_loss)?;
        self.time_curve.validate()?;
        self.damage_bonus
            .validate("scoring.damage_bonus.per_extra", "scoring.damage_bonus.cap")?;
        self.flow_bonus
            .validate("scoring.flow_bonus.per_extra", "scoring.flow_bonus.cap")?;
        self.overflow_bonus
            .validate("scoring.overflow_bonus.per_extra", "scoring.overflow_bonus.cap")
    }
}

fn check_amount(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidNumber {
            field,
            value: f64::from(value),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub damage: f32,
    pub flow_gain: f32,
    pub time_mul: f32,
    pub damage_simul_mul: f32,
    pub flow_simul_mul: f32,
    pub overflow_mul: f32,
}

/// Reward for a successful submission.
///
/// `required_min` is the lower bound of the selection's intersection window;
/// letters typed past it feed the overflow bonus.
pub fn reward(
    scoring: &ScoringConfig,
    elapsed: Duration,
    selected: usize,
    typed: usize,
    required_min: usize,
) -> Reward {
    let elapsed = if scoring.start_timer_on_select {
        elapsed
    } else {
        Duration::ZERO
    };
    let time_mul = time_multiplier(elapsed, &scoring.time_curve);
    let damage_simul_mul =
        simultaneous_multiplier(selected, scoring.damage_bonus.per_extra, scoring.damage_bonus.cap);
    let flow_simul_mul =
        simultaneous_multiplier(selected, scoring.flow_bonus.per_extra, scoring.flow_bonus.cap);
    let overflow_mul = overflow_multiplier(
        typed,
        required_min,
        scoring.overflow_bonus.per_extra,
        scoring.overflow_bonus.cap,
    );

    Reward {
        damage: scoring.base_damage * time_mul * damage_simul_mul * overflow_mul,
        flow_gain: scoring.flow_gain * time_mul * flow_simul_mul * overflow_mul,
        time_mul,
        damage_simul_mul,
        flow_simul_mul,
        overflow_mul,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_multiplier_midpoint() {
        let curve = TimeCurve::default();
        let mid = time_multiplier(Duration::from_secs(5), &curve);
        assert!((mid - 1.25).abs() < 1e-5);
    }

    #[test]
    fn overflow_counts_letters_past_minimum() {
        assert!((overflow_multiplier(12, 10, 0.1, 3.0) - 1.2).abs() < 1e-5);
        assert_eq!(overflow_multiplier(8, 10, 0.1, 3.0), 1.0);
        assert_eq!(overflow_multiplier(100, 10, 0.1, 3.0), 3.0);
    }

    #[test]
    fn timer_off_scores_as_instant() {
        let scoring = ScoringConfig {
            start_timer_on_select: false,
            ..ScoringConfig::default()
        };
        let r = reward(&scoring, Duration::from_secs(30), 1, 12, 10);
        assert_eq!(r.time_mul, 2.0);
        assert_eq!(r.damage, 20.0);
    }

    #[test]
    fn time_curve_requires_slow_after_fast() {
        let curve = TimeCurve {
            fast: Duration::from_secs(8),
            slow: Duration::from_secs(2),
            ..TimeCurve::default()
        };
        assert!(matches!(curve.validate(), Err(ConfigError::InvertedRange { .. })));

        let scoring = ScoringConfig {
            flow_loss: -1.0,
            ..ScoringConfig::default()
        };
        assert!(matches!(
            scoring.validate(),
            Err(ConfigError::InvalidNumber { field: "scoring.flow_loss", .. })
        ));
    }
}
