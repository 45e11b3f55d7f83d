use glam::{Quat, Vec3};

/// The scene camera the player looks through.
///
/// Orientation is stored as yaw (about +Y) and pitch (about the camera's right axis). With both at
/// zero the camera looks down -Z. The camera's position is its [`super::LocalTransform`]'s translation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    /// Rotation about the world up axis, in radians. Positive turns left.
    pub yaw: f32,
    /// Rotation about the camera's right axis, in radians. Positive looks up.
    pub pitch: f32,
}

/// A camera pose reduced to what the hold controller needs: an origin and three axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBasis {
    /// Where the view ray starts
    pub position: Vec3,
    /// Unit direction the camera looks in
    pub forward: Vec3,
    /// Unit vector to the right of the view
    pub right: Vec3,
    /// Unit vector upwards in the view
    pub up: Vec3,
}

impl Camera {
    /// Create a camera with the given orientation
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    /// Orientation as a quaternion: yaw first, then pitch
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    /// The view from `position` with this orientation
    pub fn view_basis(&self, position: Vec3) -> ViewBasis {
        let rotation = self.rotation();
        ViewBasis {
            position,
            forward: rotation * Vec3::NEG_Z,
            right: rotation * Vec3::X,
            up: rotation * Vec3::Y,
        }
    }
}

impl ViewBasis {
    /// Are all of the basis vectors finite?
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.forward.is_finite()
            && self.right.is_finite()
            && self.up.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_view_basis() {
        let basis = Camera::default().view_basis(Vec3::Y);
        assert_eq!(basis.position, Vec3::Y);
        assert_relative_eq!(basis.forward, Vec3::NEG_Z);
        assert_relative_eq!(basis.right, Vec3::X);
        assert_relative_eq!(basis.up, Vec3::Y);

        // Turning left by 90 degrees looks down -X.
        let basis = Camera::new(FRAC_PI_2, 0.0).view_basis(Vec3::ZERO);
        assert_relative_eq!(basis.forward, Vec3::NEG_X, epsilon = 1e-6);

        // Pitching up looks towards +Y.
        let basis = Camera::new(0.0, FRAC_PI_2).view_basis(Vec3::ZERO);
        assert_relative_eq!(basis.forward, Vec3::Y, epsilon = 1e-6);
    }
}
