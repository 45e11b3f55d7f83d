use glam::{Quat, Vec3};
use rapier3d::parry::{
    query::{Ray, RayCast},
    shape::Ball,
};

use crate::{
    components::{LocalTransform, RigidBody},
    config::PhysicsConfig,
    util::{isometry_from_translation, na_point_from_glam, na_vector_from_glam},
};

/// Floor rebounds slower than this, in units per second, are absorbed so the object can come to rest
pub const FLOOR_REST_SPEED: f32 = 1.0;

/// Axis aligned bounds of the room the object lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl RoomBounds {
    /// Clamp `point` so that a ball of `radius` centred on it stays inside the room.
    /// If the room is too small for the ball on some axis, that axis is pinned to the room's centre.
    pub fn clamp_point(&self, point: Vec3, radius: f32) -> Vec3 {
        let lo = self.min + Vec3::splat(radius);
        let hi = self.max - Vec3::splat(radius);
        let centre = (self.min + self.max) * 0.5;
        Vec3::select(lo.cmple(hi), point.clamp(lo.min(hi), hi.max(lo)), centre)
    }
}

/// A simple integrator for the single grabbable object. There is no contact resolution other
/// than against the room's walls, floor and ceiling.
#[derive(Debug, Clone)]
pub struct PhysicsContext {
    pub gravity: Vec3,
    pub horizontal_drag: f32,
    pub restitution: f32,
    pub floor_friction: f32,
    pub bounds: RoomBounds,
}

impl Default for PhysicsContext {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}

impl PhysicsContext {
    pub fn new(config: &PhysicsConfig) -> Self {
        PhysicsContext {
            gravity: config.gravity,
            horizontal_drag: config.horizontal_drag,
            restitution: config.restitution,
            floor_friction: config.floor_friction,
            bounds: RoomBounds {
                min: config.room_min,
                max: config.room_max,
            },
        }
    }

    /// Advance one body by `dt` seconds with explicit Euler. Accumulated forces are consumed.
    pub fn step(
        &self,
        transform: &mut LocalTransform,
        rigid_body: &mut RigidBody,
        radius: f32,
        dt: f32,
    ) {
        if !rigid_body.physics_enabled || dt <= 0.0 {
            rigid_body.clear_forces();
            return;
        }

        let previous_transform = *transform;
        let previous_body = rigid_body.clone();

        // Gravity and the hold spring never act together.
        let mut acceleration = rigid_body.force() / rigid_body.mass;
        if !rigid_body.levitating {
            acceleration += self.gravity;
        }
        rigid_body.linear_velocity += acceleration * dt;

        let drag = (1.0 - self.horizontal_drag * dt).max(0.0);
        rigid_body.linear_velocity.x *= drag;
        rigid_body.linear_velocity.z *= drag;

        rigid_body.angular_velocity += rigid_body.torque() / rigid_body.mass * dt;

        transform.translation += rigid_body.linear_velocity * dt;
        let spin = rigid_body.angular_velocity * dt;
        if spin.length_squared() > 0.0 {
            transform.rotation = (Quat::from_scaled_axis(spin) * transform.rotation).normalize();
        }

        self.resolve_room_contacts(transform, rigid_body, radius);
        rigid_body.clear_forces();

        if !transform.translation.is_finite()
            || !rigid_body.linear_velocity.is_finite()
            || !rigid_body.angular_velocity.is_finite()
            || !transform.rotation.is_finite()
        {
            log::warn!("[TELEKINESIS_PHYSICS] Non-finite state after step, restoring previous one");
            *transform = previous_transform;
            *rigid_body = previous_body;
            rigid_body.linear_velocity = Vec3::ZERO;
            rigid_body.angular_velocity = Vec3::ZERO;
            rigid_body.clear_forces();
        }
    }

    fn resolve_room_contacts(
        &self,
        transform: &mut LocalTransform,
        rigid_body: &mut RigidBody,
        radius: f32,
    ) {
        let lo = self.bounds.min + Vec3::splat(radius);
        let hi = self.bounds.max - Vec3::splat(radius);
        let position = &mut transform.translation;
        let velocity = &mut rigid_body.linear_velocity;

        for axis in 0..3 {
            if position[axis] < lo[axis] {
                position[axis] = lo[axis];
                if velocity[axis] < 0.0 {
                    velocity[axis] = -velocity[axis] * self.restitution;
                }
                // Floor contact
                if axis == 1 {
                    if velocity.y < FLOOR_REST_SPEED {
                        velocity.y = 0.0;
                    }
                    let keep = 1.0 - self.floor_friction;
                    velocity.x *= keep;
                    velocity.z *= keep;
                    rigid_body.angular_velocity *= keep;
                }
            } else if position[axis] > hi[axis] {
                position[axis] = hi[axis];
                if velocity[axis] > 0.0 {
                    velocity[axis] = -velocity[axis] * self.restitution;
                }
            }
        }
    }

    /// Does a ray from `origin` along `direction` hit a ball of `radius` at `centre`?
    ///
    /// A miss still counts as a hit if the ray passes within `proximity_radius` of the centre.
    /// Returns the distance along the ray.
    pub fn cast_view_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        centre: Vec3,
        radius: f32,
        proximity_radius: f32,
        max_distance: f32,
    ) -> Option<f32> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || !origin.is_finite() || !centre.is_finite() {
            return None;
        }

        let ray = Ray::new(na_point_from_glam(origin), na_vector_from_glam(direction));
        let ball = Ball::new(radius.max(f32::EPSILON));
        let isometry = isometry_from_translation(centre);
        if let Some(toi) = ball.cast_ray(&isometry, &ray, max_distance, true) {
            return Some(toi);
        }

        let (distance, along) = crate::util::distance_to_ray(origin, direction, centre);
        (along > 0.0 && along <= max_distance && distance <= proximity_radius).then_some(along)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gravity_step_before_floor_clamping() {
        let physics_context = PhysicsContext::default();
        let mut transform = LocalTransform::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let mut rigid_body = RigidBody::default();

        physics_context.step(&mut transform, &mut rigid_body, 0.35, 0.1);

        assert_relative_eq!(rigid_body.linear_velocity.y, -2.0);
        assert_relative_eq!(transform.translation.y, 4.8);
    }

    #[test]
    fn test_levitating_suspends_gravity() {
        let physics_context = PhysicsContext::default();
        let mut transform = LocalTransform::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let mut rigid_body = RigidBody::default();
        rigid_body.levitating = true;
        rigid_body.apply_force(Vec3::new(0.0, 3.0, 0.0));

        physics_context.step(&mut transform, &mut rigid_body, 0.35, 0.1);

        assert_relative_eq!(rigid_body.linear_velocity.y, 0.3);
        assert_eq!(rigid_body.force(), Vec3::ZERO);
    }

    #[test]
    fn test_floor_bounce() {
        let physics_context = PhysicsContext::default();
        let mut transform = LocalTransform::from_translation(Vec3::new(0.0, 0.4, 0.0));
        let mut rigid_body = RigidBody::default();
        rigid_body.set_linear_velocity(Vec3::new(1.0, -10.0, 0.0));

        physics_context.step(&mut transform, &mut rigid_body, 0.35, 0.1);

        // Clamped onto the floor, bounced with restitution and slowed by friction.
        assert_relative_eq!(transform.translation.y, 0.35);
        assert_relative_eq!(rigid_body.linear_velocity.y, 12.0 * 0.4, epsilon = 1e-4);
        assert!(rigid_body.linear_velocity.x < 1.0);
    }

    #[test]
    fn test_object_settles_on_floor() {
        let physics_context = PhysicsContext::default();
        let mut transform = LocalTransform::from_translation(Vec3::new(0.0, 0.35, 0.0));
        let mut rigid_body = RigidBody::default();

        for _ in 0..120 {
            physics_context.step(&mut transform, &mut rigid_body, 0.35, 1.0 / 60.0);
        }

        assert_eq!(rigid_body.linear_velocity.y, 0.0);
        assert_relative_eq!(transform.translation.y, 0.35);

        // A real drop still bounces.
        transform.translation.y = 3.0;
        let bounced = (0..60).any(|_| {
            physics_context.step(&mut transform, &mut rigid_body, 0.35, 1.0 / 60.0);
            rigid_body.linear_velocity.y > 0.0
        });
        assert!(bounced);
    }

    #[test]
    fn test_wall_reflection() {
        let physics_context = PhysicsContext::default();
        let mut transform = LocalTransform::from_translation(Vec3::new(19.6, 5.0, 0.0));
        let mut rigid_body = RigidBody::default();
        rigid_body.levitating = true;
        rigid_body.set_linear_velocity(Vec3::new(10.0, 0.0, 0.0));

        physics_context.step(&mut transform, &mut rigid_body, 0.35, 0.1);

        assert_relative_eq!(transform.translation.x, 19.65);
        assert!(rigid_body.linear_velocity.x < 0.0);
    }

    #[test]
    fn test_disabled_body_does_not_move() {
        let physics_context = PhysicsContext::default();
        let mut transform = LocalTransform::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let mut rigid_body = RigidBody::default();
        rigid_body.physics_enabled = false;
        physics_context.step(&mut transform, &mut rigid_body, 0.35, 0.1);
        assert_eq!(transform.translation, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(rigid_body.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_non_finite_force_is_contained() {
        let physics_context = PhysicsContext::default();
        let mut transform = LocalTransform::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let mut rigid_body = RigidBody::default();
        rigid_body.apply_force(Vec3::new(f32::NAN, 0.0, 0.0));

        physics_context.step(&mut transform, &mut rigid_body, 0.35, 0.1);

        assert_eq!(transform.translation, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(rigid_body.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_view_ray() {
        let physics_context = PhysicsContext::default();
        let centre = Vec3::new(0.0, 0.0, -5.0);

        // Direct hit
        let toi = physics_context
            .cast_view_ray(Vec3::ZERO, Vec3::NEG_Z, centre, 0.35, 0.5, 60.0)
            .unwrap();
        assert_relative_eq!(toi, 4.65, epsilon = 1e-4);

        // Near miss, inside the proximity radius
        let near = Vec3::new(0.45, 0.0, -5.0);
        assert!(physics_context
            .cast_view_ray(Vec3::ZERO, Vec3::NEG_Z, near, 0.35, 0.5, 60.0)
            .is_some());

        // Clean miss
        let far = Vec3::new(2.0, 0.0, -5.0);
        assert!(physics_context
            .cast_view_ray(Vec3::ZERO, Vec3::NEG_Z, far, 0.35, 0.5, 60.0)
            .is_none());

        // Behind the camera
        assert!(physics_context
            .cast_view_ray(Vec3::ZERO, Vec3::Z, centre, 0.35, 0.5, 60.0)
            .is_none());
    }

    #[test]
    fn test_clamp_point() {
        let bounds = RoomBounds {
            min: Vec3::new(-1.0, 0.0, -1.0),
            max: Vec3::new(1.0, 0.5, 1.0),
        };
        let clamped = bounds.clamp_point(Vec3::new(5.0, 5.0, 0.0), 0.3);
        assert_relative_eq!(clamped.x, 0.7);
        // Too small for the ball on this axis: pinned to the centre.
        assert_relative_eq!(clamped.y, 0.25);
        assert_relative_eq!(clamped.z, 0.0);
    }
}
