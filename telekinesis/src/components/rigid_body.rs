use glam::Vec3;

/// The simulated state of the grabbable object.
///
/// [`crate::systems::physics_system`] is the only thing that integrates this body. Other systems
/// interact with it through [`RigidBody::apply_force`] and [`RigidBody::apply_torque`], which
/// accumulate until the next physics step. The two exceptions are the grab snap and the throw
/// impulse, which use [`RigidBody::set_linear_velocity`].
///
/// While `levitating` is set gravity is not integrated: the hold controller is the only source of
/// force on the body.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    /// Units per second
    pub linear_velocity: Vec3,
    /// Radians per second, as a scaled axis
    pub angular_velocity: Vec3,
    /// Always positive
    pub mass: f32,
    /// If false, the body is frozen in place and ignored by the physics system
    pub physics_enabled: bool,
    /// Held by the hold controller: gravity is suspended
    pub levitating: bool,
    force: Vec3,
    torque: Vec3,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
            physics_enabled: true,
            levitating: false,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
        }
    }
}

impl RigidBody {
    /// Create a body with the given mass. Non-positive or non-finite masses fall back to 1.
    pub fn with_mass(mass: f32) -> Self {
        let mass = if mass.is_finite() && mass > 0.0 {
            mass
        } else {
            log::warn!("[TELEKINESIS_PHYSICS] Invalid mass {mass}, using 1.0");
            1.0
        };
        Self {
            mass,
            ..Default::default()
        }
    }

    /// Add a force for the next physics step
    pub fn apply_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Add a torque for the next physics step
    pub fn apply_torque(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    /// Replace the velocity outright. Reserved for the grab snap and the throw.
    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.linear_velocity = velocity;
    }

    /// Forces accumulated since the last physics step
    pub fn force(&self) -> Vec3 {
        self.force
    }

    /// Torques accumulated since the last physics step
    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    /// Discard accumulated forces and torques
    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }
}
