use glam::Vec3;
use rapier3d::na::{self, Isometry3, Point3, Vector3};

#[inline]
/// Convert a [`glam::Vec3`] into a [`rapier3d::na::Vector3`]
pub fn na_vector_from_glam(v: Vec3) -> Vector3<f32> {
    [v.x, v.y, v.z].into()
}

#[inline]
/// Convert a [`glam::Vec3`] into a [`rapier3d::na::Point3`]
pub fn na_point_from_glam(v: Vec3) -> Point3<f32> {
    Point3::new(v.x, v.y, v.z)
}

#[inline]
/// An isometry with no rotation, placed at `translation`
pub fn isometry_from_translation(translation: Vec3) -> Isometry3<f32> {
    Isometry3::from_parts(
        na::Translation3::new(translation.x, translation.y, translation.z),
        na::UnitQuaternion::identity(),
    )
}

#[inline]
/// Blend factor for exponential smoothing with time constant `time_constant`.
///
/// Frame rate independent: two steps of `dt` give the same result as one step of `2 * dt`.
/// A time constant of zero (or less) snaps straight to the target.
pub fn smoothing_alpha(dt: f32, time_constant: f32) -> f32 {
    if time_constant <= 0.0 {
        return 1.0;
    }
    1.0 - (-dt.max(0.0) / time_constant).exp()
}

#[inline]
/// Move `current` towards `target` by at most `max_delta`.
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    current + (target - current).clamp(-max_delta, max_delta)
}

#[inline]
/// Values inside `[-dead_zone, dead_zone]` become zero, everything else is shifted towards zero so
/// the output stays continuous.
pub fn apply_dead_zone(value: f32, dead_zone: f32) -> f32 {
    if value.abs() <= dead_zone {
        0.0
    } else {
        value - dead_zone.copysign(value)
    }
}

#[inline]
/// Distance from `point` to the closest point on the ray, along with the distance along the ray.
/// Points behind the origin are measured from the origin.
pub fn distance_to_ray(origin: Vec3, direction: Vec3, point: Vec3) -> (f32, f32) {
    let along = (point - origin).dot(direction).max(0.0);
    let closest = origin + direction * along;
    (closest.distance(point), along)
}
