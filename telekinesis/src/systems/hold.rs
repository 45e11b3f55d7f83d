use std::collections::VecDeque;

use anyhow::anyhow;
use glam::{Vec2, Vec3};
use hecs::{Entity, World};

use crate::{
    components::{Camera, Grabbable, LocalTransform, RigidBody, ViewBasis},
    config::{HoldConfig, TelekinesisConfig},
    contexts::{
        gesture_context::{Gesture, GestureSample, MotionSample},
        GestureArbiter, GestureContext, PhysicsContext,
    },
    systems::{
        aim_assist::{gather_candidates, AimAssist, AimCandidate},
        throw::{average_velocity, is_throw_intent, throw_velocity},
    },
    util::{apply_dead_zone, move_towards, smoothing_alpha},
    Engine, TelekinesisResult,
};

/// Number of object velocities remembered for the throw's momentum bonus
pub const VELOCITY_HISTORY_LENGTH: usize = 10;

/// What the hold controller is doing with the object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldMode {
    /// Nothing is hovered or held
    #[default]
    Idle,
    /// The view ray is on the object
    Hovering,
    /// The object is levitating on the hold spring
    Grabbed,
    /// The object has been thrown and belongs to ambient physics until the cooldown expires
    Thrown,
}

/// Why a held object was let go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No hand was seen for longer than the grace period
    HandLost,
    /// A release gesture was held for enough consecutive frames
    ReleaseGesture,
    /// The spring strained past its break threshold for too long
    GripBroken,
    /// The hold update failed
    Fault,
    /// The feature was turned off
    PowerOff,
    /// The player left the room
    RoomExit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Transition {
    Hover,
    Unhover,
    Grab { distance: f32 },
    Drop(DropReason),
    Throw(Vec3),
    CooldownExpired,
}

/// Where the hand was when the current hold began.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandBaseline {
    /// Palm centre, in normalised image space
    pub position: Vec2,
    /// Apparent hand size
    pub size: f32,
}

/// Everything the hold controller remembers between frames.
#[derive(Debug, Clone, Default)]
pub struct HoldState {
    pub mode: HoldMode,
    /// Where the spring pulls the object towards
    pub target_position: Vec3,
    /// Smoothed camera to target distance
    pub hold_distance: f32,
    /// Distance `hold_distance` is easing towards, rate limited
    pub target_hold_distance: f32,
    /// Camera to object distance at the moment of the grab; depth offsets are relative to this
    pub grab_distance: f32,
    /// Classifier timestamp of the sample that grabbed the object. Earlier hand motion is ignored.
    pub grab_timestamp: f64,
    pub baseline: Option<HandBaseline>,
    /// Lateral offset of the target from the view axis, in world units (x right, y up)
    pub smoothed_offset: Vec2,
    /// Rate of change of the apparent hand size, per second
    pub size_velocity: f32,
    /// Recent object velocities, newest last
    pub velocity_history: VecDeque<Vec3>,
    /// Seconds the spring force has been above the break threshold
    pub break_timer: f32,
    /// Seconds since the hand was last seen
    pub hand_lost_timer: f32,
    /// Seconds until the object may be grabbed again
    pub grab_cooldown: f32,
    /// Consecutive frames `last_release_gesture` has been seen
    pub release_gesture_hold_count: u32,
    pub last_release_gesture: Gesture,
    /// The target is pinned until the move gesture returns
    pub frozen: bool,
    last_hand_size: Option<(f64, f32)>,
    last_view: Option<ViewBasis>,
    aim_candidates: Vec<AimCandidate>,
}

impl HoldState {
    /// Forget everything about the current hold. The grab cooldown is kept.
    pub fn reset(&mut self) {
        let grab_cooldown = self.grab_cooldown;
        *self = Self {
            grab_cooldown,
            ..Default::default()
        };
    }

    fn clear_hold(&mut self) {
        self.baseline = None;
        self.smoothed_offset = Vec2::ZERO;
        self.size_velocity = 0.0;
        self.last_hand_size = None;
        self.velocity_history.clear();
        self.break_timer = 0.0;
        self.hand_lost_timer = 0.0;
        self.release_gesture_hold_count = 0;
        self.last_release_gesture = Gesture::None;
        self.frozen = false;
    }
}

/// Hold system
/// Walks the hold state machine for the grabbable object and applies the hold spring.
/// An internal fault drops the object into ambient physics rather than leaving it levitating.
pub fn hold_system(engine: &mut Engine, dt: f32) {
    let result = hold_system_inner(
        &mut engine.world,
        engine.object_entity,
        engine.camera_entity,
        &engine.gesture_context,
        &engine.physics_context,
        &engine.config,
        &mut engine.hold_state,
        &mut engine.aim_assist,
        &mut engine.arbiter,
        dt,
    );

    if let Err(e) = result {
        log::error!("[TELEKINESIS_HOLD] Hold update failed, dropping object: {e:?}");
        force_release(
            &mut engine.world,
            engine.object_entity,
            &mut engine.hold_state,
            &engine.config.hold,
            DropReason::Fault,
        );
        engine.arbiter.reset();
    }
}

#[allow(clippy::too_many_arguments)]
pub fn hold_system_inner(
    world: &mut World,
    object: Entity,
    camera: Entity,
    gesture_context: &GestureContext,
    physics_context: &PhysicsContext,
    config: &TelekinesisConfig,
    state: &mut HoldState,
    aim_assist: &mut AimAssist,
    arbiter: &mut GestureArbiter,
    dt: f32,
) -> TelekinesisResult<()> {
    let view = current_view(world, camera, state)?;

    // Get next mode
    if let Some(next) = run(
        world,
        object,
        view,
        gesture_context,
        physics_context,
        config,
        state,
        aim_assist,
        dt,
    )? {
        // If the mode has changed, transition
        transition(
            world,
            object,
            view,
            gesture_context.sample(),
            config,
            state,
            aim_assist,
            next,
        )?;
    }

    let sample = gesture_context.sample();
    let manipulating = match state.mode {
        HoldMode::Grabbed => true,
        HoldMode::Hovering => sample.gesture == config.gestures.grab && sample.hand_present(),
        _ => false,
    };
    arbiter.report_manipulation(manipulating);

    Ok(())
}

/// Drop the object immediately, whatever the hold controller is doing.
///
/// Power off and room exit forget the grab cooldown too; any other reason starts it.
/// Never fails: if the object has gone from the world there is nothing to drop.
pub fn force_release(
    world: &mut World,
    object: Entity,
    state: &mut HoldState,
    config: &HoldConfig,
    reason: DropReason,
) {
    if let Ok(mut rigid_body) = world.get::<&mut RigidBody>(object) {
        rigid_body.levitating = false;
        rigid_body.clear_forces();
    }

    if state.mode == HoldMode::Grabbed {
        log::info!("[TELEKINESIS_HOLD] Object dropped: {reason:?}");
    }

    if matches!(reason, DropReason::PowerOff | DropReason::RoomExit) {
        *state = Default::default();
    } else {
        state.reset();
        state.grab_cooldown = config.grab_cooldown;
    }
}

fn current_view(
    world: &World,
    camera: Entity,
    state: &mut HoldState,
) -> TelekinesisResult<ViewBasis> {
    let view = {
        let orientation = world.get::<&Camera>(camera)?;
        let transform = world.get::<&LocalTransform>(camera)?;
        orientation.view_basis(transform.translation)
    };

    if view.is_finite() {
        state.last_view = Some(view);
        return Ok(view);
    }

    log::warn!("[TELEKINESIS_HOLD] Camera transform is not finite, using the last valid one");
    state
        .last_view
        .ok_or_else(|| anyhow!("Camera transform is not finite and no previous one exists").into())
}

#[allow(clippy::too_many_arguments)]
fn run(
    world: &mut World,
    object: Entity,
    view: ViewBasis,
    gesture_context: &GestureContext,
    physics_context: &PhysicsContext,
    config: &TelekinesisConfig,
    state: &mut HoldState,
    aim_assist: &mut AimAssist,
    dt: f32,
) -> TelekinesisResult<Option<Transition>> {
    state.grab_cooldown = (state.grab_cooldown - dt).max(0.0);

    let hold_config = &config.hold;
    let (position, radius) = {
        let transform = world.get::<&LocalTransform>(object)?;
        let grabbable = world.get::<&Grabbable>(object)?;
        (transform.translation, grabbable.radius)
    };
    let sample = gesture_context.sample();

    match state.mode {
        HoldMode::Idle | HoldMode::Hovering => {
            let hit = physics_context.cast_view_ray(
                view.position,
                view.forward,
                position,
                radius,
                hold_config.hover_proximity_radius,
                hold_config.max_ray_distance,
            );

            return Ok(match (state.mode, hit) {
                (HoldMode::Idle, Some(_)) => Some(Transition::Hover),
                (HoldMode::Hovering, None) => Some(Transition::Unhover),
                (HoldMode::Hovering, Some(_))
                    if sample.gesture == config.gestures.grab
                        && sample.hand_present()
                        && state.grab_cooldown <= 0.0 =>
                {
                    Some(Transition::Grab {
                        distance: view.position.distance(position),
                    })
                }
                _ => None,
            });
        }
        HoldMode::Thrown => {
            if state.grab_cooldown <= 0.0 {
                return Ok(Some(Transition::CooldownExpired));
            }
            return Ok(None);
        }
        HoldMode::Grabbed => {}
    }

    {
        let rigid_body = world.get::<&RigidBody>(object)?;
        if state.velocity_history.len() == VELOCITY_HISTORY_LENGTH {
            state.velocity_history.pop_front();
        }
        state.velocity_history.push_back(rigid_body.linear_velocity);
    }

    if !sample.hand_present() {
        state.hand_lost_timer += dt;
        state.release_gesture_hold_count = 0;
        state.last_release_gesture = Gesture::None;
        if state.hand_lost_timer >= hold_config.hand_lost_grace {
            return Ok(Some(Transition::Drop(DropReason::HandLost)));
        }
    } else {
        state.hand_lost_timer = 0.0;
        let gesture = sample.gesture;
        let bindings = &config.gestures;

        if bindings.is_release(gesture) {
            if gesture == state.last_release_gesture {
                state.release_gesture_hold_count += 1;
            } else {
                state.last_release_gesture = gesture;
                state.release_gesture_hold_count = 1;
            }
            if state.release_gesture_hold_count >= hold_config.release_stability_frames {
                return Ok(Some(Transition::Drop(DropReason::ReleaseGesture)));
            }
        } else {
            state.release_gesture_hold_count = 0;
            state.last_release_gesture = Gesture::None;

            if gesture == bindings.r#move {
                if state.frozen {
                    unfreeze(state, sample, hold_config);
                }
                let motion = gesture_context.motion_since(state.grab_timestamp);
                if is_throw_intent(&motion, &config.throw) {
                    return Ok(Some(Transition::Throw(compute_throw(
                        &view, &motion, state, config,
                    ))));
                }
                gather_candidates(world, &mut state.aim_candidates);
                update_target(
                    view,
                    sample,
                    physics_context,
                    hold_config,
                    radius,
                    state,
                    aim_assist,
                    dt,
                );
            } else if gesture == bindings.freeze && !state.frozen {
                log::debug!("[TELEKINESIS_HOLD] Frozen");
                state.frozen = true;
            }
        }
    }

    apply_spring(world, object, state, hold_config, dt)?;

    if state.break_timer > hold_config.break_duration {
        return Ok(Some(Transition::Drop(DropReason::GripBroken)));
    }

    Ok(None)
}

#[allow(clippy::too_many_arguments)]
fn transition(
    world: &mut World,
    object: Entity,
    view: ViewBasis,
    sample: &GestureSample,
    config: &TelekinesisConfig,
    state: &mut HoldState,
    aim_assist: &mut AimAssist,
    next: Transition,
) -> TelekinesisResult<()> {
    let hold_config = &config.hold;
    let next_mode = match (state.mode, next) {
        (HoldMode::Idle, Transition::Hover) => HoldMode::Hovering,
        (HoldMode::Hovering, Transition::Unhover) => HoldMode::Idle,
        (HoldMode::Hovering, Transition::Grab { distance }) => {
            let distance =
                distance.clamp(hold_config.min_hold_distance, hold_config.max_hold_distance);
            let position = {
                let mut rigid_body = world.get::<&mut RigidBody>(object)?;
                rigid_body.levitating = true;
                rigid_body.set_linear_velocity(Vec3::ZERO);
                rigid_body.clear_forces();
                world.get::<&LocalTransform>(object)?.translation
            };

            state.clear_hold();
            state.hold_distance = distance;
            state.target_hold_distance = distance;
            state.grab_distance = distance;
            state.target_position = position;
            state.grab_timestamp = sample.timestamp;
            state.baseline = capture_baseline(sample);
            log::info!("[TELEKINESIS_HOLD] Grabbed at {distance:.2}m");
            HoldMode::Grabbed
        }
        (HoldMode::Grabbed, Transition::Drop(reason)) => {
            {
                let mut rigid_body = world.get::<&mut RigidBody>(object)?;
                rigid_body.levitating = false;
                rigid_body.clear_forces();
            }
            state.clear_hold();
            state.grab_cooldown = hold_config.grab_cooldown;
            log::info!("[TELEKINESIS_HOLD] Object dropped: {reason:?}");
            HoldMode::Idle
        }
        (HoldMode::Grabbed, Transition::Throw(velocity)) => {
            {
                let mut rigid_body = world.get::<&mut RigidBody>(object)?;
                rigid_body.levitating = false;
                rigid_body.clear_forces();
                rigid_body.set_linear_velocity(velocity);
            }
            aim_assist.release_lock();
            state.clear_hold();
            state.grab_cooldown = hold_config.grab_cooldown;
            log::info!(
                "[TELEKINESIS_HOLD] Thrown at {:.2}m/s, {:.2} along view",
                velocity.length(),
                velocity.normalize_or_zero().dot(view.forward)
            );
            HoldMode::Thrown
        }
        (HoldMode::Thrown, Transition::CooldownExpired) => HoldMode::Idle,
        (mode, next) => {
            return Err(anyhow!("Invalid hold transition {mode:?} -> {next:?}").into());
        }
    };

    log::debug!("[TELEKINESIS_HOLD] {:?} -> {:?}", state.mode, next_mode);
    state.mode = next_mode;
    Ok(())
}

fn capture_baseline(sample: &GestureSample) -> Option<HandBaseline> {
    let position = sample.palm_center()?;
    let size = sample.hand_size()?;
    (position.is_finite() && size.is_finite()).then_some(HandBaseline { position, size })
}

/// Leaving the freeze gesture: re-anchor the hand so the current offsets are preserved.
fn unfreeze(state: &mut HoldState, sample: &GestureSample, config: &HoldConfig) {
    log::debug!("[TELEKINESIS_HOLD] Unfrozen");
    state.frozen = false;
    state.last_hand_size = None;
    state.size_velocity = 0.0;
    state.grab_distance = state.target_hold_distance;
    state.baseline = capture_baseline(sample).map(|mut baseline| {
        if config.lateral_gain > 0.0 {
            let offset = state.smoothed_offset / config.lateral_gain;
            baseline.position -= Vec2::new(offset.x, -offset.y);
        }
        baseline
    });
}

fn compute_throw(
    view: &ViewBasis,
    motion: &MotionSample,
    state: &HoldState,
    config: &TelekinesisConfig,
) -> Vec3 {
    let momentum = average_velocity(state.velocity_history.iter());
    throw_velocity(view, motion, momentum, &config.throw)
}

#[allow(clippy::too_many_arguments)]
fn update_target(
    view: ViewBasis,
    sample: &GestureSample,
    physics_context: &PhysicsContext,
    config: &HoldConfig,
    radius: f32,
    state: &mut HoldState,
    aim_assist: &mut AimAssist,
    dt: f32,
) {
    let (Some(palm), Some(size)) = (sample.palm_center(), sample.hand_size()) else {
        return;
    };
    if !palm.is_finite() || !size.is_finite() {
        log::warn!("[TELEKINESIS_HOLD] Non-finite hand landmarks, keeping the last target");
        return;
    }

    // Size velocity only changes when a new sample arrives.
    match state.last_hand_size {
        Some((timestamp, previous)) if sample.timestamp > timestamp => {
            let elapsed = (sample.timestamp - timestamp) as f32;
            state.size_velocity = (size - previous) / elapsed;
            state.last_hand_size = Some((sample.timestamp, size));
        }
        Some(_) => {}
        None => state.last_hand_size = Some((sample.timestamp, size)),
    }

    let baseline = state.baseline.get_or_insert(HandBaseline {
        position: palm,
        size,
    });

    // Centering: the baseline creeps towards the hand so long holds drift back to the view axis.
    let drift = (config.centering_rate * dt).clamp(0.0, 1.0);
    baseline.position += (palm - baseline.position) * drift;

    // Image y grows downwards.
    let delta = palm - baseline.position;
    let raw_offset = Vec2::new(delta.x, -delta.y) * config.lateral_gain;
    let smoothed_offset = state.smoothed_offset
        + (raw_offset - state.smoothed_offset) * smoothing_alpha(dt, config.lateral_time_constant);

    // A bigger hand is closer to the sensor: pushing towards the screen sends the object away.
    let size_delta = size - baseline.size + state.size_velocity * config.size_velocity_gain;
    let depth_offset = apply_dead_zone(size_delta, config.depth_dead_zone) * config.depth_gain;

    let (min, max) = (config.min_hold_distance, config.max_hold_distance);
    let goal = (state.grab_distance + depth_offset).clamp(min, max);
    let target_hold_distance =
        move_towards(state.target_hold_distance, goal, config.hold_distance_rate * dt.max(0.0))
            .clamp(min, max);
    let hold_distance = (state.hold_distance
        + (target_hold_distance - state.hold_distance)
            * smoothing_alpha(dt, config.hold_distance_time_constant))
    .clamp(min, max);

    let target = view.position
        + view.forward * hold_distance
        + view.right * smoothed_offset.x
        + view.up * smoothed_offset.y;
    if !target.is_finite() || !goal.is_finite() {
        log::warn!("[TELEKINESIS_HOLD] Non-finite hold target, keeping the last one");
        return;
    }

    state.smoothed_offset = smoothed_offset;
    state.target_hold_distance = target_hold_distance;
    state.hold_distance = hold_distance;

    let bounds = &physics_context.bounds;
    let target = bounds.clamp_point(target, radius);
    let assisted = aim_assist.apply(target, &state.aim_candidates, dt);
    state.target_position = bounds.clamp_point(assisted, radius);
}

fn apply_spring(
    world: &mut World,
    object: Entity,
    state: &mut HoldState,
    config: &HoldConfig,
    dt: f32,
) -> TelekinesisResult<()> {
    let position = world.get::<&LocalTransform>(object)?.translation;
    let mut rigid_body = world.get::<&mut RigidBody>(object)?;
    let mass = rigid_body.mass;

    let force = (state.target_position - position) * config.spring_constant * mass
        - rigid_body.linear_velocity * config.damping * mass;
    if !force.is_finite() {
        log::warn!("[TELEKINESIS_HOLD] Non-finite spring force, skipping frame");
        return Ok(());
    }

    // The grip breaks on the force the spring wanted, not the clamped one.
    if force.length() > config.break_force_threshold {
        state.break_timer += dt;
    } else {
        state.break_timer = 0.0;
    }

    rigid_body.apply_force(force.clamp_length_max(config.max_force));
    let torque = -rigid_body.angular_velocity * config.angular_damping * mass;
    rigid_body.apply_torque(torque);

    Ok(())
}
