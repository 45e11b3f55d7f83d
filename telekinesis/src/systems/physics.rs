use glam::Vec3;
use hecs::{Entity, World};

use crate::{
    components::{Grabbable, Info, LocalTransform, RigidBody},
    contexts::PhysicsContext,
    Engine,
};

/// Spawn the object the player can pick up.
pub fn add_grabbable_object(
    world: &mut World,
    name: &str,
    position: Vec3,
    mass: f32,
    radius: f32,
) -> Entity {
    world.spawn((
        Info::new(name),
        LocalTransform::from_translation(position),
        RigidBody::with_mass(mass),
        Grabbable {
            radius: radius.max(0.0),
        },
    ))
}

/// Physics system
/// Integrates every grabbable rigid body by one frame, consuming the forces applied to it since the last frame.
pub fn physics_system(engine: &mut Engine, dt: f32) {
    physics_system_inner(&mut engine.world, &engine.physics_context, dt);
}

pub fn physics_system_inner(world: &mut World, physics_context: &PhysicsContext, dt: f32) {
    for (_, (transform, rigid_body, grabbable)) in
        world.query_mut::<(&mut LocalTransform, &mut RigidBody, &Grabbable)>()
    {
        physics_context.step(transform, rigid_body, grabbable.radius, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    pub fn test_physics_system() {
        let mut world = World::default();
        let physics_context = PhysicsContext::default();
        let object =
            add_grabbable_object(&mut world, "Crate", Vec3::new(0.0, 5.0, -3.0), 2.0, 0.35);

        physics_system_inner(&mut world, &physics_context, 0.1);

        let rigid_body = world.get::<&RigidBody>(object).unwrap();
        assert_relative_eq!(rigid_body.linear_velocity.y, -2.0);
        let transform = world.get::<&LocalTransform>(object).unwrap();
        assert_relative_eq!(transform.translation.y, 4.8);
    }

    #[test]
    pub fn test_object_comes_to_rest_on_floor() {
        let mut world = World::default();
        let physics_context = PhysicsContext::default();
        let object =
            add_grabbable_object(&mut world, "Crate", Vec3::new(0.0, 3.0, -3.0), 1.0, 0.35);

        for _ in 0..600 {
            physics_system_inner(&mut world, &physics_context, 1.0 / 60.0);
        }

        let transform = world.get::<&LocalTransform>(object).unwrap();
        assert_relative_eq!(transform.translation.y, 0.35, epsilon = 0.01);
    }
}
