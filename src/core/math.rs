//! Geometry Primitives
//!
//! Orientation, ranges, boxes and the planar push-out helpers used by
//! collision resolution and sector queries. All angles are in degrees.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::rng::RandomSource;

/// Yaw/pitch/roll orientation in degrees.
///
/// Yaw rotates about +Z (0 = facing +X), positive pitch looks down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EulerAngles {
    /// Rotation about +Z
    pub yaw: f32,
    /// Rotation about the local +Y axis
    pub pitch: f32,
    /// Rotation about the forward axis
    pub roll: f32,
}

impl EulerAngles {
    /// Identity orientation (facing +X).
    pub const ZERO: Self = Self { yaw: 0.0, pitch: 0.0, roll: 0.0 };

    /// Create from explicit components.
    pub const fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Create a level orientation with the given yaw.
    pub const fn from_yaw(yaw: f32) -> Self {
        Self { yaw, pitch: 0.0, roll: 0.0 }
    }

    /// Unit forward vector for this orientation.
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        Vec3::new(cy * cp, sy * cp, -sp)
    }

    /// Orientation whose forward vector points along `direction`.
    ///
    /// Returns `ZERO` for a zero-length direction.
    pub fn looking_along(direction: Vec3) -> Self {
        if direction.length_squared() == 0.0 {
            return Self::ZERO;
        }
        let planar = Vec2::new(direction.x, direction.y).length();
        Self {
            yaw: direction.y.atan2(direction.x).to_degrees(),
            pitch: (-direction.z).atan2(planar).to_degrees(),
            roll: 0.0,
        }
    }
}

/// Inclusive float interval, used for damage rolls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
}

impl FloatRange {
    /// The empty `[0, 0]` range.
    pub const ZERO: Self = Self { min: 0.0, max: 0.0 };

    /// Create a new range.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Whether both bounds are zero or below.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.max <= 0.0 && self.min <= 0.0
    }

    /// Roll a uniform value in the range.
    pub fn roll(&self, rng: &mut dyn RandomSource) -> f32 {
        rng.float_in_range(self.min, self.max)
    }
}

/// Axis-aligned rectangle in the XY plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb2 {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Aabb2 {
    /// Create from corners.
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Closest point on or inside the box.
    pub fn nearest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }
}

/// Axis-aligned box in 3-D.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb3 {
    /// Create from corners.
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Planar footprint.
    pub fn footprint(&self) -> Aabb2 {
        Aabb2::new(self.min.truncate(), self.max.truncate())
    }
}

// =============================================================================
// ANGLES
// =============================================================================

/// Signed shortest rotation from `start` to `end`, in `(-180, 180]`.
pub fn angular_displacement(start: f32, end: f32) -> f32 {
    let mut delta = (end - start) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Turn `current` toward `goal` by at most `max_delta` degrees.
pub fn turned_toward(current: f32, goal: f32, max_delta: f32) -> f32 {
    let delta = angular_displacement(current, goal);
    let max_delta = max_delta.abs();
    if delta.abs() <= max_delta {
        goal
    } else {
        current + max_delta.copysign(delta)
    }
}

/// Whether `point` lies in the planar sector at `apex` facing `forward_degrees`.
///
/// The sector spans `aperture_degrees` in total and extends to `radius`.
pub fn is_point_inside_directed_sector_2d(
    point: Vec2,
    apex: Vec2,
    forward_degrees: f32,
    aperture_degrees: f32,
    radius: f32,
) -> bool {
    let offset = point - apex;
    let dist_sq = offset.length_squared();
    if dist_sq > radius * radius {
        return false;
    }
    if dist_sq == 0.0 {
        return true;
    }
    let heading = offset.y.atan2(offset.x).to_degrees();
    angular_displacement(forward_degrees, heading).abs() <= aperture_degrees * 0.5
}

// =============================================================================
// PLANAR PUSH-OUT
// =============================================================================

/// Push a disc so it no longer contains `point`. Returns true if moved.
pub fn push_disc_out_of_point_2d(center: &mut Vec2, radius: f32, point: Vec2) -> bool {
    let offset = *center - point;
    let dist_sq = offset.length_squared();
    if dist_sq >= radius * radius {
        return false;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist > 0.0 { offset / dist } else { Vec2::X };
    *center += normal * (radius - dist);
    true
}

/// Push a disc out of a fixed disc. Returns true if moved.
pub fn push_disc_out_of_disc_2d(center: &mut Vec2, radius: f32, fixed_center: Vec2, fixed_radius: f32) -> bool {
    push_disc_out_of_point_2d(center, radius + fixed_radius, fixed_center)
}

/// Push two discs apart, each by half the overlap. Returns true if moved.
pub fn push_discs_out_of_each_other_2d(a: &mut Vec2, radius_a: f32, b: &mut Vec2, radius_b: f32) -> bool {
    let offset = *a - *b;
    let combined = radius_a + radius_b;
    let dist_sq = offset.length_squared();
    if dist_sq >= combined * combined {
        return false;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist > 0.0 { offset / dist } else { Vec2::X };
    let half = (combined - dist) * 0.5;
    *a += normal * half;
    *b -= normal * half;
    true
}

/// Push a disc out of a box footprint. Returns true if moved.
///
/// A center inside the box leaves through the nearest face.
pub fn push_disc_out_of_aabb_2d(center: &mut Vec2, radius: f32, aabb: &Aabb2) -> bool {
    let nearest = aabb.nearest_point(*center);
    if nearest != *center {
        return push_disc_out_of_point_2d(center, radius, nearest);
    }

    let to_left = center.x - aabb.min.x;
    let to_right = aabb.max.x - center.x;
    let to_bottom = center.y - aabb.min.y;
    let to_top = aabb.max.y - center.y;
    let min = to_left.min(to_right).min(to_bottom).min(to_top);

    if min == to_left {
        center.x = aabb.min.x - radius;
    } else if min == to_right {
        center.x = aabb.max.x + radius;
    } else if min == to_bottom {
        center.y = aabb.min.y - radius;
    } else {
        center.y = aabb.max.y + radius;
    }
    true
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_forward_vectors() {
        let f = EulerAngles::from_yaw(0.0).forward();
        assert!((f - Vec3::X).length() < EPS);

        let f = EulerAngles::from_yaw(90.0).forward();
        assert!((f - Vec3::Y).length() < EPS);

        // Positive pitch looks down
        let f = EulerAngles::new(0.0, 90.0, 0.0).forward();
        assert!((f - Vec3::NEG_Z).length() < EPS);
    }

    #[test]
    fn test_looking_along_inverts_forward() {
        let dir = Vec3::new(1.0, 1.0, -0.5).normalize();
        let angles = EulerAngles::looking_along(dir);
        assert!((angles.forward() - dir).length() < EPS);
    }

    #[test]
    fn test_angular_displacement_wraps() {
        assert!((angular_displacement(350.0, 10.0) - 20.0).abs() < EPS);
        assert!((angular_displacement(10.0, 350.0) + 20.0).abs() < EPS);
        assert!((angular_displacement(0.0, 180.0) - 180.0).abs() < EPS);
    }

    #[test]
    fn test_turned_toward_is_bounded() {
        assert!((turned_toward(0.0, 90.0, 30.0) - 30.0).abs() < EPS);
        assert!((turned_toward(0.0, -90.0, 30.0) + 30.0).abs() < EPS);
        assert!((turned_toward(0.0, 20.0, 30.0) - 20.0).abs() < EPS);
    }

    #[test]
    fn test_directed_sector() {
        let apex = Vec2::ZERO;
        assert!(is_point_inside_directed_sector_2d(Vec2::new(2.0, 0.5), apex, 0.0, 90.0, 5.0));
        assert!(!is_point_inside_directed_sector_2d(Vec2::new(-2.0, 0.0), apex, 0.0, 90.0, 5.0));
        assert!(!is_point_inside_directed_sector_2d(Vec2::new(6.0, 0.0), apex, 0.0, 90.0, 5.0));
        // 50 degrees off axis is outside a 90 degree aperture
        let p = Vec2::new(50f32.to_radians().cos(), 50f32.to_radians().sin());
        assert!(!is_point_inside_directed_sector_2d(p, apex, 0.0, 90.0, 5.0));
    }

    #[test]
    fn test_push_discs_apart_symmetric() {
        let mut a = Vec2::new(0.0, 0.0);
        let mut b = Vec2::new(1.0, 0.0);
        assert!(push_discs_out_of_each_other_2d(&mut a, 1.0, &mut b, 1.0));
        assert!((a.x + 0.5).abs() < EPS);
        assert!((b.x - 1.5).abs() < EPS);
    }

    #[test]
    fn test_push_disc_out_of_aabb() {
        let tile = Aabb2::new(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0));

        // Touching from the left side
        let mut c = Vec2::new(0.8, 0.5);
        assert!(push_disc_out_of_aabb_2d(&mut c, 0.5, &tile));
        assert!((c.x - 0.5).abs() < EPS);

        // Center inside exits via nearest face
        let mut c = Vec2::new(1.1, 0.5);
        assert!(push_disc_out_of_aabb_2d(&mut c, 0.25, &tile));
        assert!((c.x - 0.75).abs() < EPS);

        // Clear of the box
        let mut c = Vec2::new(0.0, 0.5);
        assert!(!push_disc_out_of_aabb_2d(&mut c, 0.5, &tile));
    }
}
