//! Per-entity animated visual attributes.
//!
//! Every attribute is a current/target pair. Callers only ever move the
//! target; `advance` pulls the current value toward it with an
//! exponential-decay step that is bounded by 1, so repeated steps converge
//! monotonically and a step of exactly 1 lands on the target bit-for-bit.

use crate::palette::Rgb;
use nalgebra::Point3;

/// Clamps to [0, 1], mapping NaN to 0.
pub fn clamp_unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Clamps a monetary magnitude to a finite, non-negative value.
pub fn sanitize_volume(v: f64) -> f64 {
    if v.is_nan() || v <= 0.0 {
        0.0
    } else {
        v.min(f64::MAX)
    }
}

/// Interpolation step for one frame.
///
/// `min(dt / duration, 1) * catch_up`, clamped so it never exceeds 1.
pub fn step_factor(dt: f32, transition_duration: f32, catch_up: f32) -> f32 {
    if transition_duration <= 0.0 {
        return 1.0;
    }
    let ratio = (dt.max(0.0) / transition_duration).min(1.0);
    (ratio * catch_up).clamp(0.0, 1.0)
}

/// Gap below which an animated value counts as arrived.
pub const SETTLE_EPSILON: f32 = 1e-3;

/// Values that can be blended component-wise.
pub trait Blend: Copy {
    fn blend(self, target: Self, t: f32) -> Self;
    fn gap(self, other: Self) -> f32;
}

impl Blend for f32 {
    fn blend(self, target: Self, t: f32) -> Self {
        self + (target - self) * t
    }

    fn gap(self, other: Self) -> f32 {
        (self - other).abs()
    }
}

impl Blend for Point3<f32> {
    fn blend(self, target: Self, t: f32) -> Self {
        Point3::from(self.coords + (target.coords - self.coords) * t)
    }

    fn gap(self, other: Self) -> f32 {
        (self - other).norm()
    }
}

impl Blend for Rgb {
    fn blend(self, target: Self, t: f32) -> Self {
        Rgb::new(
            self.r + (target.r - self.r) * t,
            self.g + (target.g - self.g) * t,
            self.b + (target.b - self.b) * t,
        )
    }

    fn gap(self, other: Self) -> f32 {
        self.distance(other)
    }
}

/// A current/target pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animated<T: Blend> {
    current: T,
    target: T,
}

impl<T: Blend> Animated<T> {
    /// Starts settled at `value`.
    pub fn settled(value: T) -> Self {
        Self {
            current: value,
            target: value,
        }
    }

    pub fn current(&self) -> T {
        self.current
    }

    pub fn target(&self) -> T {
        self.target
    }

    pub fn set_target(&mut self, target: T) {
        self.target = target;
    }

    /// Jumps the current value to the target.
    pub fn snap(&mut self) {
        self.current = self.target;
    }

    /// Moves current toward target by `alpha` of the remaining gap.
    ///
    /// Lands on the target once the gap falls under [`SETTLE_EPSILON`] or a
    /// step stops making progress in f32.
    pub fn advance(&mut self, alpha: f32) {
        if alpha >= 1.0 {
            self.current = self.target;
        } else if alpha > 0.0 {
            let next = self.current.blend(self.target, alpha);
            if next.gap(self.target) <= SETTLE_EPSILON || next.gap(self.current) == 0.0 {
                self.current = self.target;
            } else {
                self.current = next;
            }
        }
    }

    /// Remaining distance to the target.
    pub fn remaining(&self) -> f32 {
        self.current.gap(self.target)
    }
}

/// Target visual attributes computed from a snapshot record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualTargets {
    pub position: Point3<f32>,
    pub scale: f32,
    pub color: Rgb,
    pub glow: f32,
}

/// Animated attribute set owned by the node layer, one per live entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityVisualState {
    pub position: Animated<Point3<f32>>,
    pub scale: Animated<f32>,
    pub color: Animated<Rgb>,
    pub glow: Animated<f32>,
}

impl EntityVisualState {
    /// New entity: current = target, no animation from an undefined origin.
    pub fn spawn(targets: VisualTargets) -> Self {
        Self {
            position: Animated::settled(targets.position),
            scale: Animated::settled(targets.scale),
            color: Animated::settled(targets.color),
            glow: Animated::settled(targets.glow),
        }
    }

    /// Keeps in-flight current values and aims at new targets.
    pub fn retarget(&mut self, targets: VisualTargets) {
        self.position.set_target(targets.position);
        self.scale.set_target(targets.scale);
        self.color.set_target(targets.color);
        self.glow.set_target(targets.glow);
    }

    pub fn advance(&mut self, alpha: f32) {
        self.position.advance(alpha);
        self.scale.advance(alpha);
        self.color.advance(alpha);
        self.glow.advance(alpha);
    }

    /// True when every attribute sits on its target.
    pub fn is_settled(&self) -> bool {
        self.position.remaining() == 0.0
            && self.scale.remaining() == 0.0
            && self.color.remaining() == 0.0
            && self.glow.remaining() == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn targets(x: f32) -> VisualTargets {
        VisualTargets {
            position: Point3::new(x, 2.0 * x, -x),
            scale: 1.0 + x,
            color: Rgb::new(0.1, 0.2, 0.3),
            glow: 0.0,
        }
    }

    #[test]
    fn test_step_factor_bounds() {
        assert_relative_eq!(step_factor(0.016, 0.8, 3.0), 0.06, epsilon = 1e-6);
        assert_eq!(step_factor(1.0, 0.8, 3.0), 1.0);
        assert_eq!(step_factor(-1.0, 0.8, 3.0), 0.0);
        assert_eq!(step_factor(0.016, 0.0, 3.0), 1.0);
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(f32::NAN), 0.0);
        assert_eq!(clamp_unit(-0.5), 0.0);
        assert_eq!(clamp_unit(1.5), 1.0);
        assert_eq!(clamp_unit(0.25), 0.25);
    }

    #[test]
    fn test_sanitize_volume() {
        assert_eq!(sanitize_volume(-10.0), 0.0);
        assert_eq!(sanitize_volume(f64::NAN), 0.0);
        assert_eq!(sanitize_volume(42.0), 42.0);
    }

    #[test]
    fn test_spawn_is_settled() {
        let state = EntityVisualState::spawn(targets(3.0));
        assert!(state.is_settled());
    }

    #[test]
    fn test_retarget_keeps_current() {
        let mut state = EntityVisualState::spawn(targets(1.0));
        state.retarget(targets(5.0));

        assert_eq!(state.position.current(), Point3::new(1.0, 2.0, -1.0));
        assert_eq!(state.position.target(), Point3::new(5.0, 10.0, -5.0));
    }

    #[test]
    fn test_full_step_lands_exactly() {
        let mut state = EntityVisualState::spawn(targets(1.0));
        state.retarget(targets(7.3));
        state.advance(step_factor(1.0, 0.8, 3.0));
        assert!(state.is_settled());
    }

    #[test]
    fn test_small_steps_reach_target() {
        // 60 Hz with default timing: alpha = 1/16 every frame
        let alpha = step_factor(1.0 / 60.0, 0.8, 3.0);
        let mut state = EntityVisualState::spawn(targets(-40.0));
        state.retarget(targets(55.5));

        let mut frames = 0;
        while !state.is_settled() && frames < 600 {
            state.advance(alpha);
            frames += 1;
        }
        assert!(state.is_settled(), "still moving after {} frames", frames);
        assert_eq!(state.position.current(), state.position.target());
    }

    #[test]
    fn test_stalled_step_snaps() {
        // A gap of one ulp cannot shrink by 1/16 in f32
        let start = 1000.0f32;
        let end = f32::from_bits(start.to_bits() + 1);
        let mut value = Animated::settled(start);
        value.set_target(end);
        value.advance(0.0625);
        assert_eq!(value.remaining(), 0.0);
    }

    #[test]
    fn test_large_gap_is_not_snapped() {
        let mut value = Animated::settled(0.0f32);
        value.set_target(10.0);
        value.advance(0.0625);
        assert_relative_eq!(value.current(), 0.625, epsilon = 1e-6);
        assert!(value.remaining() > SETTLE_EPSILON);
    }

    proptest! {
        #[test]
        fn prop_error_decreases_monotonically(
            start in -100.0f32..100.0,
            end in -100.0f32..100.0,
            dt in 0.001f32..0.05,
        ) {
            let mut value = Animated::settled(start);
            value.set_target(end);
            let alpha = step_factor(dt, 0.8, 3.0);
            let mut previous = value.remaining();
            for _ in 0..50 {
                value.advance(alpha);
                let now = value.remaining();
                prop_assert!(now <= previous);
                previous = now;
            }
        }
    }
}
