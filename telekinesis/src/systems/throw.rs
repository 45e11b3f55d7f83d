use glam::Vec3;

use crate::{
    components::ViewBasis, config::ThrowConfig, contexts::gesture_context::MotionSample,
};

/// Does this hand motion mean the player wants to throw?
pub fn is_throw_intent(motion: &MotionSample, config: &ThrowConfig) -> bool {
    let upward_speed = -motion.velocity.y;
    motion.wrist_flick > config.flick_threshold
        || motion.velocity.length() > config.hand_speed_threshold
        || upward_speed > config.upward_swipe_threshold
}

/// The single velocity given to the object when it is thrown.
///
/// `momentum` is the object's average velocity over the last few held frames, so the throw carries
/// on from whatever the object was already doing. The result always has a positive component along
/// the camera's forward axis and a speed within `[min_speed, max_speed]`.
pub fn throw_velocity(
    view: &ViewBasis,
    motion: &MotionSample,
    momentum: Vec3,
    config: &ThrowConfig,
) -> Vec3 {
    let hand_speed = motion.velocity.length();
    let speed = (config.min_speed
        + config.flick_gain * motion.wrist_flick
        + config.speed_gain * hand_speed)
        .clamp(config.min_speed, config.max_speed);

    // Image space y grows downwards.
    let hand_direction =
        (view.right * motion.velocity.x - view.up * motion.velocity.y).normalize_or_zero();
    let upward_speed = (-motion.velocity.y).max(0.0);
    let arc = (upward_speed * config.upward_arc_gain).min(config.max_upward_arc);

    let blended = view.forward * config.forward_weight
        + hand_direction * config.hand_direction_weight
        + Vec3::Y * arc;
    let direction = if blended.dot(view.forward) > 0.0 {
        blended.normalize()
    } else {
        view.forward
    };

    let mut velocity = direction * speed;
    let with_momentum = velocity + momentum;
    if with_momentum.is_finite() && with_momentum.dot(view.forward) > 0.0 {
        velocity = with_momentum;
    }

    let length = velocity.length();
    if length > config.max_speed {
        velocity *= config.max_speed / length;
    } else if length < config.min_speed && length > 0.0 {
        velocity *= config.min_speed / length;
    }

    if !velocity.is_finite() || velocity.dot(view.forward) <= 0.0 {
        return view.forward * speed;
    }
    velocity
}

/// Average of the recorded velocities, or zero if there are none.
pub fn average_velocity<'a>(velocities: impl ExactSizeIterator<Item = &'a Vec3>) -> Vec3 {
    let count = velocities.len();
    if count == 0 {
        return Vec3::ZERO;
    }
    velocities.copied().sum::<Vec3>() / count as f32
}
