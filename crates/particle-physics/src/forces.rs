//! Per-particle motion rule
//!
//! Each particle is advanced independently: the update reads only that
//! particle's own position and velocity, so any partition of the index range
//! can be processed in parallel without coordination.

use glam::{Vec3, Vec4};

use crate::constants::{GRAVITY, TIMESTEP};

/// Advances a single particle by one tick, in place
///
/// Implementations must be pure functions of `(position, velocity)` and must
/// leave the homogeneous `w` lanes untouched.
pub trait MotionRule: Sync {
    fn advance(&self, position: &mut Vec4, velocity: &mut Vec4);
}

/// Radial pull towards the origin with constant-acceleration kinematics
///
/// The acceleration is `-strength * p / |v|`: the position vector is scaled by
/// the particle's *speed*, not by its distance from the origin. A particle at
/// rest therefore divides by zero; the resulting non-finite values propagate
/// into its state rather than being clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialGravity {
    /// Timestep in seconds
    pub dt: f32,
    /// Acceleration magnitude
    pub strength: f32,
}

impl Default for RadialGravity {
    fn default() -> Self {
        Self {
            dt: TIMESTEP,
            strength: GRAVITY,
        }
    }
}

impl RadialGravity {
    pub fn new(dt: f32, strength: f32) -> Self {
        Self { dt, strength }
    }

    /// Acceleration acting on a particle with the given position and velocity
    pub fn acceleration(&self, position: Vec3, velocity: Vec3) -> Vec3 {
        let d = velocity.length();
        position / d * -self.strength
    }
}

impl MotionRule for RadialGravity {
    #[inline]
    fn advance(&self, position: &mut Vec4, velocity: &mut Vec4) {
        let t = self.dt;
        let p = position.truncate();
        let v = velocity.truncate();
        let g = self.acceleration(p, v);

        // p' = p + v t + g t^2 / 2
        *position = (p + v * t + 0.5 * t * t * g).extend(position.w);
        // v' = v + g t
        *velocity = (v + g * t).extend(velocity.w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-4;

    fn assert_close(actual: Vec3, expected: Vec3) {
        assert!(
            (actual - expected).abs().max_element() < TOLERANCE,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_unit_speed_unit_height() {
        let rule = RadialGravity::new(0.01, 9.0);
        let mut p = Vec4::new(0.0, 0.0, 1.0, 1.0);
        let mut v = Vec4::new(1.0, 0.0, 0.0, 0.0);

        assert_close(rule.acceleration(p.truncate(), v.truncate()), Vec3::new(0.0, 0.0, -9.0));

        rule.advance(&mut p, &mut v);

        assert_close(p.truncate(), Vec3::new(0.01, 0.0, 0.99955));
        assert_close(v.truncate(), Vec3::new(1.0, 0.0, -0.09));
    }

    #[test]
    fn test_acceleration_scales_with_position() {
        // |v| = 1 so the pull is 9 * p = 90 at height 10
        let rule = RadialGravity::new(0.01, 9.0);
        let mut p = Vec4::new(0.0, 0.0, 10.0, 1.0);
        let mut v = Vec4::new(1.0, 0.0, 0.0, 0.0);

        rule.advance(&mut p, &mut v);

        assert_close(p.truncate(), Vec3::new(0.01, 0.0, 9.9955));
        assert_close(v.truncate(), Vec3::new(1.0, 0.0, -0.9));
    }

    #[test]
    fn test_faster_particles_feel_less_pull() {
        let rule = RadialGravity::default();
        let p = Vec3::new(3.0, -4.0, 0.0);

        let slow = rule.acceleration(p, Vec3::new(0.0, 1.0, 0.0));
        let fast = rule.acceleration(p, Vec3::new(0.0, 2.0, 0.0));

        assert_close(slow, fast * 2.0);
        // Always directed towards the origin
        assert!(slow.dot(p) < 0.0);
    }

    #[test]
    fn test_homogeneous_lanes_preserved() {
        let rule = RadialGravity::default();
        let mut p = Vec4::new(5.0, 6.0, -7.0, 1.0);
        let mut v = Vec4::new(-2.0, 0.5, 3.0, 0.0);

        for _ in 0..100 {
            rule.advance(&mut p, &mut v);
        }

        assert_eq!(p.w, 1.0);
        assert_eq!(v.w, 0.0);
    }

    #[test]
    fn test_zero_velocity_propagates_non_finite() {
        let rule = RadialGravity::default();
        let mut p = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let mut v = Vec4::new(0.0, 0.0, 0.0, 0.0);

        rule.advance(&mut p, &mut v);

        assert!(!p.x.is_finite());
        assert!(!v.x.is_finite());
        // 0 / 0 on the untouched axes
        assert!(p.y.is_nan());
        assert_eq!(p.w, 1.0);
        assert_eq!(v.w, 0.0);
    }

    #[test]
    fn test_advance_is_deterministic() {
        let rule = RadialGravity::default();
        let start_p = Vec4::new(12.5, -3.25, 30.0, 1.0);
        let start_v = Vec4::new(-9.5, 4.0, 0.125, 0.0);

        let run = || {
            let (mut p, mut v) = (start_p, start_v);
            rule.advance(&mut p, &mut v);
            (p, v)
        };

        let (p1, v1) = run();
        let (p2, v2) = run();

        assert_eq!(p1.to_array().map(f32::to_bits), p2.to_array().map(f32::to_bits));
        assert_eq!(v1.to_array().map(f32::to_bits), v2.to_array().map(f32::to_bits));
    }
}
