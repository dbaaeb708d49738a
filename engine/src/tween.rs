use std::time::Duration;

/// Linear interpolation with `t` clamped to `0.0..=1.0`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Position of `value` between `a` and `b`, clamped to `0.0..=1.0`.
///
/// `a` may be greater than `b`; a degenerate range maps to 0.
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// A value moving from `from` to `to` over `duration`, advanced by the frame
/// loop. Starting a new tween simply replaces the old one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// A tween already resting at `value`.
    pub fn settled(value: f32) -> Self {
        Self::new(value, value, Duration::ZERO)
    }

    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn value(&self) -> f32 {
        lerp(self.from, self.to, self.progress())
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn advance(&mut self, dt: Duration) -> f32 {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
        self.value()
    }

    pub fn finish(&mut self) {
        self.elapsed = self.duration;
    }
}
