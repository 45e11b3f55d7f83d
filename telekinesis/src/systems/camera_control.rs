use glam::{Vec2, Vec3};
use hecs::{Entity, World};

use crate::{
    components::{Camera, Info, LocalTransform},
    config::{CameraControlConfig, GestureBindings},
    contexts::{gesture_context::GestureSample, GestureArbiter},
    util::smoothing_alpha,
    Engine, TelekinesisResult,
};

/// Spawn the camera the player looks through.
pub fn add_camera(world: &mut World, position: Vec3, camera: Camera) -> Entity {
    world.spawn((
        Info::new("Camera"),
        camera,
        LocalTransform::from_translation(position),
    ))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraControlState {
    /// Palm position when the camera gesture began; `None` while no camera gesture is active
    pub baseline_hand: Option<Vec2>,
    pub baseline_yaw: f32,
    pub baseline_pitch: f32,
    pub smoothed_yaw: f32,
    pub smoothed_pitch: f32,
    /// The camera ignores gestures until the engine clock passes this time
    pub cooldown_until: f64,
}

impl CameraControlState {
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

/// Gesture camera system
/// Rotates the camera while a camera gesture is held, unless the hold controller has the gesture channel.
pub fn camera_control_system(engine: &mut Engine, dt: f32) {
    let now = engine.elapsed();
    let result = camera_control_system_inner(
        &mut engine.world,
        engine.camera_entity,
        engine.gesture_context.sample(),
        &engine.arbiter,
        &engine.config.gestures,
        &engine.config.camera,
        &mut engine.camera_control_state,
        now,
        dt,
    );

    if let Err(e) = result {
        log::error!("[TELEKINESIS_CAMERA] Unable to update camera: {e:?}");
        engine.camera_control_state.baseline_hand = None;
    }
}

#[allow(clippy::too_many_arguments)]
pub fn camera_control_system_inner(
    world: &mut World,
    camera_entity: Entity,
    sample: &GestureSample,
    arbiter: &GestureArbiter,
    bindings: &GestureBindings,
    config: &CameraControlConfig,
    state: &mut CameraControlState,
    now: f64,
    dt: f32,
) -> TelekinesisResult<()> {
    let gesture = sample.gesture;

    if bindings.is_manipulation(gesture) || arbiter.is_manipulating() {
        if state.baseline_hand.is_some() {
            log::debug!("[TELEKINESIS_CAMERA] Manipulation gesture observed, camera cooling down");
        }
        state.cooldown_until = now + config.cooldown as f64;
        state.baseline_hand = None;
        return Ok(());
    }

    if now < state.cooldown_until || !bindings.is_camera(gesture) {
        state.baseline_hand = None;
        return Ok(());
    }

    let Some(palm) = sample.palm_center().filter(|p| p.is_finite()) else {
        state.baseline_hand = None;
        return Ok(());
    };

    let mut camera = world.get::<&mut Camera>(camera_entity)?;

    let Some(baseline) = state.baseline_hand else {
        // Gesture entry: everything is measured relative to this moment.
        state.baseline_hand = Some(palm);
        state.baseline_yaw = camera.yaw;
        state.baseline_pitch = camera.pitch;
        state.smoothed_yaw = camera.yaw;
        state.smoothed_pitch = camera.pitch;
        return Ok(());
    };

    // Hand right turns right, hand up looks up. Image y grows downwards.
    let delta = palm - baseline;
    let raw_yaw = state.baseline_yaw - delta.x * config.yaw_gain;
    let raw_pitch = (state.baseline_pitch - delta.y * config.pitch_gain)
        .clamp(-config.max_pitch, config.max_pitch);

    let alpha = smoothing_alpha(dt, config.smoothing_time_constant);
    state.smoothed_yaw += (raw_yaw - state.smoothed_yaw) * alpha;
    state.smoothed_pitch += (raw_pitch - state.smoothed_pitch) * alpha;

    let max_step = config.max_rotation_rate * dt.max(0.0);
    camera.yaw += (state.smoothed_yaw - camera.yaw).clamp(-max_step, max_step);
    camera.pitch = (camera.pitch
        + (state.smoothed_pitch - camera.pitch).clamp(-max_step, max_step))
    .clamp(-config.max_pitch, config.max_pitch);

    Ok(())
}
