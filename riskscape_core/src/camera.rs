//! Camera pose, easing curves and the rig shared by user input and autopilot.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Camera position plus the point it looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Point3<f32>,
    pub look_at: Point3<f32>,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 45.0, 90.0), Point3::new(0.0, 10.0, 0.0))
    }
}

impl CameraPose {
    pub fn new(position: Point3<f32>, look_at: Point3<f32>) -> Self {
        Self { position, look_at }
    }

    /// Straight-line interpolation of both points.
    pub fn lerp(&self, other: &CameraPose, t: f32) -> CameraPose {
        CameraPose {
            position: self.position + (other.position - self.position) * t,
            look_at: self.look_at + (other.look_at - self.look_at) * t,
        }
    }

    /// Largest of the two point distances.
    pub fn distance(&self, other: &CameraPose) -> f32 {
        let dp = (self.position - other.position).norm();
        let dl = (self.look_at - other.look_at).norm();
        dp.max(dl)
    }
}

/// Easing curves for keyframe playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Maps progress in [0, 1] to an eased fraction in [0, 1].
    pub fn apply(self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => t,
            Easing::EaseOut => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// The scene camera. External input is gated by a flag that the
/// autopilot clears while it owns the camera.
#[derive(Debug, Clone)]
pub struct CameraRig {
    pose: CameraPose,
    input_enabled: bool,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(CameraPose::default())
    }
}

impl CameraRig {
    pub fn new(pose: CameraPose) -> Self {
        Self {
            pose,
            input_enabled: true,
        }
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    /// Unconditional pose write, used by the autopilot.
    pub fn set_pose(&mut self, pose: CameraPose) {
        self.pose = pose;
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    /// User orbit around the look-at point (radians). Ignored while input
    /// is disabled.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) -> bool {
        if !self.input_enabled {
            return false;
        }
        let offset = self.pose.position - self.pose.look_at;
        let radius = offset.norm();
        if radius <= f32::EPSILON {
            return false;
        }
        let azimuth = offset.z.atan2(offset.x) + yaw;
        let elevation = ((offset.y / radius).asin() + pitch).clamp(-1.5, 1.5);
        let horizontal = radius * elevation.cos();
        self.pose.position = self.pose.look_at
            + Vector3::new(
                horizontal * azimuth.cos(),
                radius * elevation.sin(),
                horizontal * azimuth.sin(),
            );
        true
    }

    /// User dolly toward (positive) or away from the look-at point.
    pub fn dolly(&mut self, amount: f32) -> bool {
        if !self.input_enabled {
            return false;
        }
        let offset = self.pose.position - self.pose.look_at;
        let radius = offset.norm();
        if radius <= f32::EPSILON {
            return false;
        }
        let next = (radius - amount).max(1.0);
        self.pose.position = self.pose.look_at + offset * (next / radius);
        true
    }

    /// User pan: moves position and look-at together.
    pub fn pan(&mut self, delta: Vector3<f32>) -> bool {
        if !self.input_enabled {
            return false;
        }
        self.pose.position += delta;
        self.pose.look_at += delta;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_easing_endpoints() {
        for easing in [Easing::Linear, Easing::EaseOut, Easing::EaseInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_relative_eq!(easing.apply(1.0), 1.0, epsilon = 1e-6);
        }
        assert_relative_eq!(Easing::EaseInOut.apply(0.5), 0.5, epsilon = 1e-6);
        assert!(Easing::EaseOut.apply(0.25) > 0.25);
    }

    #[test]
    fn test_pose_lerp() {
        let a = CameraPose::new(Point3::origin(), Point3::new(0.0, 0.0, -1.0));
        let b = CameraPose::new(Point3::new(10.0, 0.0, 0.0), Point3::new(10.0, 0.0, -1.0));
        let mid = a.lerp(&b, 0.5);
        assert_relative_eq!(mid.position.x, 5.0);
        assert_relative_eq!(mid.look_at.x, 5.0);
        assert_eq!(a.lerp(&b, 1.0), b);
    }

    #[test]
    fn test_input_gate() {
        let mut rig = CameraRig::default();
        let start = rig.pose();
        rig.set_input_enabled(false);

        assert!(!rig.orbit(0.3, 0.1));
        assert!(!rig.dolly(5.0));
        assert!(!rig.pan(Vector3::x()));
        assert_eq!(rig.pose(), start);

        rig.set_input_enabled(true);
        assert!(rig.pan(Vector3::x()));
        assert_relative_eq!(rig.pose().look_at.x, start.look_at.x + 1.0);
    }

    #[test]
    fn test_orbit_keeps_radius() {
        let mut rig = CameraRig::default();
        let before = (rig.pose().position - rig.pose().look_at).norm();
        rig.orbit(0.7, -0.2);
        let after = (rig.pose().position - rig.pose().look_at).norm();
        assert_relative_eq!(before, after, epsilon = 1e-3);
    }

    proptest! {
        #[test]
        fn prop_easing_is_monotonic(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for easing in [Easing::Linear, Easing::EaseOut, Easing::EaseInOut] {
                prop_assert!(easing.apply(lo) <= easing.apply(hi) + 1e-6);
            }
        }
    }
}
