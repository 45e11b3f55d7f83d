use glam::{Quat, Vec3};

/// The entity's position in the scene.
///
/// For the grabbable object this is written only by [`crate::systems::physics_system`]; the hold
/// controller moves it by applying forces to its [`super::RigidBody`].
#[derive(Clone, PartialEq, Debug, Copy)]
pub struct LocalTransform {
    /// The translation of the entity
    pub translation: Vec3,
    /// The rotation of the entity
    pub rotation: Quat,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl LocalTransform {
    /// A transform at `translation` with no rotation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }
}
