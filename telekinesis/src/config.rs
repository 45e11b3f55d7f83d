use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{contexts::gesture_context::Gesture, TelekinesisResult};

/// Every tunable used by the engine, resolved once when the [`crate::Engine`] is built.
///
/// All sections default to values that feel reasonable at 60-120 fps with a classifier running at
/// roughly 15-30 Hz. Any field may be omitted from a JSON file; missing fields take their default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelekinesisConfig {
    /// Which gesture labels drive which action
    pub gestures: GestureBindings,
    /// Spring-damper hold and target tracking
    pub hold: HoldConfig,
    /// Throw detection and impulse
    pub throw: ThrowConfig,
    /// Ambient physics for the object when it is not held
    pub physics: PhysicsConfig,
    /// Target magnetism towards anchors
    pub aim_assist: AimAssistConfig,
    /// Gesture driven camera rotation
    pub camera: CameraControlConfig,
}

/// Maps classifier labels to hold and camera actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureBindings {
    /// Grabs the hovered object
    pub grab: Gesture,
    /// Steers the held object, and throws it when moved fast enough
    pub r#move: Gesture,
    /// Drops the held object
    pub drop: Gesture,
    /// A second label that also drops the object
    pub alternate_release: Option<Gesture>,
    /// Pins the held object where it is
    pub freeze: Gesture,
    /// Gestures that rotate the camera. Never overlaps the manipulation set after normalisation.
    pub camera: Vec<Gesture>,
}

impl Default for GestureBindings {
    fn default() -> Self {
        Self {
            grab: Gesture::ClosedFist,
            r#move: Gesture::ClosedFist,
            drop: Gesture::OpenHand,
            alternate_release: Some(Gesture::Pinch),
            freeze: Gesture::TwoFinger,
            camera: vec![Gesture::ThreeFinger],
        }
    }
}

impl GestureBindings {
    /// Is this gesture one that the hold controller reacts to?
    pub fn is_manipulation(&self, gesture: Gesture) -> bool {
        gesture != Gesture::None
            && (gesture == self.grab
                || gesture == self.r#move
                || gesture == self.drop
                || gesture == self.freeze
                || Some(gesture) == self.alternate_release)
    }

    /// Does this gesture drop the held object?
    pub fn is_release(&self, gesture: Gesture) -> bool {
        gesture == self.drop || Some(gesture) == self.alternate_release
    }

    /// Does this gesture rotate the camera?
    pub fn is_camera(&self, gesture: Gesture) -> bool {
        self.camera.contains(&gesture)
    }
}

/// Hold controller tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    /// Spring constant `K`, per second squared
    pub spring_constant: f32,
    /// Damping coefficient `D`, per second
    pub damping: f32,
    /// Upper bound on the magnitude of the applied spring force
    pub max_force: f32,
    /// Torque per unit of angular velocity, per unit mass
    pub angular_damping: f32,
    /// Spring force above which the grip starts to strain
    pub break_force_threshold: f32,
    /// How long the spring force must stay above the threshold before the grip fails, in seconds
    pub break_duration: f32,
    /// Closest the object may be held to the camera
    pub min_hold_distance: f32,
    /// Furthest the object may be held from the camera
    pub max_hold_distance: f32,
    /// Maximum rate of change of the target hold distance, in units per second
    pub hold_distance_rate: f32,
    /// Time constant with which the hold distance follows its target
    pub hold_distance_time_constant: f32,
    /// Seconds the hand may be missing before the object drops
    pub hand_lost_grace: f32,
    /// Consecutive frames a release gesture must be seen before the object is dropped
    pub release_stability_frames: u32,
    /// Re-grab is blocked for this long after any release, in seconds
    pub grab_cooldown: f32,
    /// World units of lateral offset per unit of normalised hand movement
    pub lateral_gain: f32,
    /// Time constant of the lateral offset smoothing
    pub lateral_time_constant: f32,
    /// Rate at which the hand baseline drifts towards the current hand position
    pub centering_rate: f32,
    /// World units of depth per unit of hand size change
    pub depth_gain: f32,
    /// Seconds of hand size velocity added to the depth input
    pub size_velocity_gain: f32,
    /// Hand size changes smaller than this are ignored
    pub depth_dead_zone: f32,
    /// How close the view ray must pass to the object's centre to count as hovering
    pub hover_proximity_radius: f32,
    /// Objects further away than this cannot be hovered
    pub max_ray_distance: f32,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            spring_constant: 40.0,
            damping: 9.0,
            max_force: 600.0,
            angular_damping: 4.0,
            break_force_threshold: 400.0,
            break_duration: 0.5,
            min_hold_distance: 1.5,
            max_hold_distance: 40.0,
            hold_distance_rate: 6.0,
            hold_distance_time_constant: 0.12,
            hand_lost_grace: 0.2,
            release_stability_frames: 5,
            grab_cooldown: 0.25,
            lateral_gain: 8.0,
            lateral_time_constant: 0.1,
            centering_rate: 0.15,
            depth_gain: 25.0,
            size_velocity_gain: 0.05,
            depth_dead_zone: 0.01,
            hover_proximity_radius: 0.5,
            max_ray_distance: 60.0,
        }
    }
}

/// Throw detection and impulse tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowConfig {
    /// Slowest possible throw, in units per second
    pub min_speed: f32,
    /// Fastest possible throw, in units per second
    pub max_speed: f32,
    /// Extra speed per radian per second of wrist flick
    pub flick_gain: f32,
    /// Extra speed per unit of planar hand speed
    pub speed_gain: f32,
    /// Wrist flick, in radians per second, that triggers a throw
    pub flick_threshold: f32,
    /// Planar hand speed, in normalised units per second, that triggers a throw
    pub hand_speed_threshold: f32,
    /// Upward hand speed that triggers an underhand throw
    pub upward_swipe_threshold: f32,
    /// Share of the throw direction taken from the view direction
    pub forward_weight: f32,
    /// Share of the throw direction taken from the hand's motion
    pub hand_direction_weight: f32,
    /// Upward bonus per unit of upward hand speed
    pub upward_arc_gain: f32,
    /// Cap on the upward bonus
    pub max_upward_arc: f32,
}

impl Default for ThrowConfig {
    fn default() -> Self {
        Self {
            min_speed: 6.0,
            max_speed: 30.0,
            flick_gain: 2.0,
            speed_gain: 8.0,
            flick_threshold: 9.0,
            hand_speed_threshold: 2.2,
            upward_swipe_threshold: 1.6,
            forward_weight: 0.8,
            hand_direction_weight: 0.2,
            upward_arc_gain: 0.15,
            max_upward_arc: 0.5,
        }
    }
}

/// Ambient physics tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Acceleration applied to the object while it is not held
    pub gravity: Vec3,
    /// Fraction of horizontal velocity lost per second
    pub horizontal_drag: f32,
    /// Share of the velocity kept when bouncing off the room
    pub restitution: f32,
    /// Fraction of horizontal and angular velocity lost on each floor contact
    pub floor_friction: f32,
    /// Lowest corner of the room
    pub room_min: Vec3,
    /// Highest corner of the room
    pub room_max: Vec3,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -20.0, 0.0),
            horizontal_drag: 0.3,
            restitution: 0.4,
            floor_friction: 0.2,
            room_min: Vec3::new(-20.0, 0.0, -40.0),
            room_max: Vec3::new(20.0, 12.0, 20.0),
        }
    }
}

/// Aim assist tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimAssistConfig {
    /// Turns aim assist off entirely
    pub enabled: bool,
    /// Candidates closer than this to the target can be locked
    pub acquire_radius: f32,
    /// Must be larger than `acquire_radius`
    pub release_radius: f32,
    /// Largest share of the distance to the locked anchor the target is pulled by
    pub max_strength: f32,
    /// Time a candidate must stay inside the acquire radius before locking
    pub acquire_dwell: f32,
    /// Locks older than this are released, and the anchor is ignored until it is left
    pub max_lock_duration: f32,
    /// Time constant with which the applied strength follows its goal
    pub strength_time_constant: f32,
}

impl Default for AimAssistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            acquire_radius: 1.5,
            release_radius: 2.5,
            max_strength: 0.35,
            acquire_dwell: 0.08,
            max_lock_duration: 4.0,
            strength_time_constant: 0.15,
        }
    }
}

/// Gesture camera tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraControlConfig {
    /// Radians of yaw per unit of normalised hand movement
    pub yaw_gain: f32,
    /// Radians of pitch per unit of normalised hand movement
    pub pitch_gain: f32,
    /// Time constant of the rotation smoothing
    pub smoothing_time_constant: f32,
    /// Radians per second
    pub max_rotation_rate: f32,
    /// Pitch is clamped to this, in both directions
    pub max_pitch: f32,
    /// Seconds the camera stays inert after a manipulation gesture
    pub cooldown: f32,
}

impl Default for CameraControlConfig {
    fn default() -> Self {
        Self {
            yaw_gain: 2.0,
            pitch_gain: 1.5,
            smoothing_time_constant: 0.08,
            max_rotation_rate: 6.0,
            max_pitch: 1.2,
            cooldown: 0.35,
        }
    }
}

impl TelekinesisConfig {
    /// Parse a configuration from JSON, normalising it before returning.
    pub fn from_json(json: &str) -> TelekinesisResult<Self> {
        let config: TelekinesisConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> TelekinesisResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Repair values that would otherwise break the invariants the systems rely on.
    pub fn normalized(mut self) -> Self {
        let hold = &mut self.hold;
        if hold.min_hold_distance > hold.max_hold_distance {
            log::warn!(
                "[TELEKINESIS_CONFIG] min_hold_distance {} > max_hold_distance {}, swapping",
                hold.min_hold_distance,
                hold.max_hold_distance
            );
            std::mem::swap(&mut hold.min_hold_distance, &mut hold.max_hold_distance);
        }
        hold.min_hold_distance = non_negative(hold.min_hold_distance, 0.0);
        hold.max_hold_distance = hold.max_hold_distance.max(hold.min_hold_distance);
        hold.max_force = non_negative(hold.max_force, HoldConfig::default().max_force);
        hold.hold_distance_rate = non_negative(hold.hold_distance_rate, 0.0);
        hold.hand_lost_grace = non_negative(hold.hand_lost_grace, 0.0);
        hold.break_duration = non_negative(hold.break_duration, 0.0);
        hold.grab_cooldown = non_negative(hold.grab_cooldown, 0.0);
        hold.release_stability_frames = hold.release_stability_frames.max(1);

        let throw = &mut self.throw;
        if throw.min_speed > throw.max_speed {
            log::warn!(
                "[TELEKINESIS_CONFIG] throw min_speed {} > max_speed {}, swapping",
                throw.min_speed,
                throw.max_speed
            );
            std::mem::swap(&mut throw.min_speed, &mut throw.max_speed);
        }
        throw.min_speed = non_negative(throw.min_speed, 0.0);
        throw.max_speed = throw.max_speed.max(throw.min_speed);

        let physics = &mut self.physics;
        let (min, max) = (physics.room_min, physics.room_max);
        physics.room_min = min.min(max);
        physics.room_max = min.max(max);
        physics.restitution = physics.restitution.clamp(0.0, 1.0);
        physics.floor_friction = physics.floor_friction.clamp(0.0, 1.0);
        physics.horizontal_drag = non_negative(physics.horizontal_drag, 0.0);

        let aim_assist = &mut self.aim_assist;
        aim_assist.acquire_radius = non_negative(aim_assist.acquire_radius, 0.0);
        if aim_assist.release_radius <= aim_assist.acquire_radius {
            log::warn!(
                "[TELEKINESIS_CONFIG] aim assist release_radius {} must exceed acquire_radius {}",
                aim_assist.release_radius,
                aim_assist.acquire_radius
            );
            aim_assist.release_radius = aim_assist.acquire_radius * 1.5 + f32::EPSILON;
        }
        aim_assist.max_strength = aim_assist.max_strength.clamp(0.0, 1.0);
        aim_assist.max_lock_duration = non_negative(aim_assist.max_lock_duration, 0.0);

        let camera = &mut self.camera;
        camera.max_rotation_rate = non_negative(camera.max_rotation_rate, 0.0);
        camera.max_pitch = camera.max_pitch.clamp(0.0, std::f32::consts::FRAC_PI_2);

        let gestures = &mut self.gestures;
        let overlapping = gestures
            .camera
            .iter()
            .filter(|g| **g == Gesture::None || gestures.is_manipulation(**g))
            .copied()
            .collect::<Vec<_>>();
        if !overlapping.is_empty() {
            log::warn!(
                "[TELEKINESIS_CONFIG] Removing camera gestures that overlap manipulation: {:?}",
                overlapping
            );
            gestures.camera.retain(|g| !overlapping.contains(g));
        }

        self
    }
}

// NaN and negative values fall back to `fallback`.
fn non_negative(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_already_normalized() {
        let config = TelekinesisConfig::default();
        assert_eq!(config.clone().normalized(), config);
    }

    #[test]
    fn test_inverted_bounds_are_repaired() {
        let mut config = TelekinesisConfig::default();
        config.hold.min_hold_distance = 40.0;
        config.hold.max_hold_distance = 1.5;
        config.throw.min_speed = 30.0;
        config.throw.max_speed = 6.0;
        config.aim_assist.release_radius = 0.5;
        config.physics.room_min = Vec3::new(5.0, 5.0, 5.0);
        config.physics.room_max = Vec3::new(-5.0, 0.0, -5.0);

        let config = config.normalized();
        assert_eq!(config.hold.min_hold_distance, 1.5);
        assert_eq!(config.hold.max_hold_distance, 40.0);
        assert_eq!(config.throw.min_speed, 6.0);
        assert_eq!(config.throw.max_speed, 30.0);
        assert!(config.aim_assist.release_radius > config.aim_assist.acquire_radius);
        assert_eq!(config.physics.room_min, Vec3::new(-5.0, 0.0, -5.0));
        assert_eq!(config.physics.room_max, Vec3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_camera_gestures_never_overlap_manipulation() {
        let mut config = TelekinesisConfig::default();
        config.gestures.camera = vec![Gesture::ClosedFist, Gesture::ThreeFinger, Gesture::None];
        let config = config.normalized();
        assert_eq!(config.gestures.camera, vec![Gesture::ThreeFinger]);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{ "hold": { "min_hold_distance": 2.0 }, "gestures": { "drop": "Pinch", "alternate_release": null } }"#;
        let config = TelekinesisConfig::from_json(json).unwrap();
        assert_eq!(config.hold.min_hold_distance, 2.0);
        assert_eq!(config.hold.max_hold_distance, 40.0);
        assert_eq!(config.gestures.drop, Gesture::Pinch);
        assert_eq!(config.gestures.alternate_release, None);
        assert_eq!(config.throw, ThrowConfig::default());
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            TelekinesisConfig::from_json("{ not json"),
            Err(crate::TelekinesisError::ConfigError(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(matches!(
            TelekinesisConfig::from_file("/definitely/not/here.json"),
            Err(crate::TelekinesisError::IO(_))
        ));
    }
}
