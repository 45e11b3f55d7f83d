use std::collections::VecDeque;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

pub const WRIST: usize = 0;
pub const INDEX_MCP: usize = 5;
pub const MIDDLE_MCP: usize = 9;
pub const PINKY_MCP: usize = 17;
/// Number of landmarks in a complete hand
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Motion is estimated over samples no older than this, in seconds
pub const MOTION_WINDOW: f64 = 0.15;

/// A discrete hand pose, as emitted by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gesture {
    /// No hand was detected
    #[default]
    None,
    OpenHand,
    ClosedFist,
    Pinch,
    TwoFinger,
    ThreeFinger,
}

/// One classifier result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureSample {
    pub gesture: Gesture,
    /// Hand landmarks in normalised image space: x to the right, y downwards, z towards the sensor
    pub landmarks: Vec<Vec3>,
    /// Seconds, in the classifier's clock
    pub timestamp: f64,
}

impl GestureSample {
    pub fn new(gesture: Gesture, landmarks: Vec<Vec3>, timestamp: f64) -> Self {
        Self {
            gesture,
            landmarks,
            timestamp,
        }
    }

    /// Does this sample contain a usable hand?
    pub fn hand_present(&self) -> bool {
        self.gesture != Gesture::None && self.landmarks.len() >= HAND_LANDMARK_COUNT
    }

    /// Centre of the palm, taken as the mean of the wrist and the index and pinky knuckles.
    pub fn palm_center(&self) -> Option<Vec2> {
        if !self.hand_present() {
            return None;
        }
        let sum = self.landmarks[WRIST] + self.landmarks[INDEX_MCP] + self.landmarks[PINKY_MCP];
        Some((sum / 3.0).truncate())
    }

    /// Apparent size of the hand, used as a monocular depth proxy: a bigger hand is closer to the sensor.
    pub fn hand_size(&self) -> Option<f32> {
        if !self.hand_present() {
            return None;
        }
        Some(
            self.landmarks[WRIST]
                .truncate()
                .distance(self.landmarks[MIDDLE_MCP].truncate()),
        )
    }

    /// Angle of the wrist to middle knuckle vector in the image plane.
    pub fn wrist_angle(&self) -> Option<f32> {
        if !self.hand_present() {
            return None;
        }
        let d = (self.landmarks[MIDDLE_MCP] - self.landmarks[WRIST]).truncate();
        Some(d.y.atan2(d.x))
    }
}

/// Motion derived from recent samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionSample {
    /// Planar palm velocity in normalised image units per second (y downwards)
    pub velocity: Vec2,
    /// Magnitude of the wrist's rotation rate, in radians per second
    pub wrist_flick: f32,
}

#[derive(Debug, Clone, Copy)]
struct MotionPoint {
    timestamp: f64,
    palm: Vec2,
    wrist_angle: f32,
}

/// Context that holds the most recent classifier output. Samples use last-value semantics: a new
/// sample replaces the old one, and the host loop keeps reading the old one until it does.
#[derive(Debug, Default)]
pub struct GestureContext {
    current: GestureSample,
    motion: MotionSample,
    history: VecDeque<MotionPoint>,
}

impl GestureContext {
    /// Replace the current sample. Samples older than the current one are discarded.
    pub fn receive(&mut self, sample: GestureSample) {
        if sample.timestamp < self.current.timestamp {
            log::trace!(
                "[TELEKINESIS_GESTURE] Discarding out of order sample {} < {}",
                sample.timestamp,
                self.current.timestamp
            );
            return;
        }
        self.update_motion(&sample);
        self.current = sample;
    }

    pub fn sample(&self) -> &GestureSample {
        &self.current
    }

    pub fn gesture(&self) -> Gesture {
        self.current.gesture
    }

    pub fn motion(&self) -> MotionSample {
        self.motion
    }

    /// Motion over the trailing window, ignoring samples taken before `since`.
    pub fn motion_since(&self, since: f64) -> MotionSample {
        let mut points = self.history.iter().filter(|p| p.timestamp >= since);
        let Some(oldest) = points.next() else {
            return MotionSample::default();
        };
        let newest = points.last().unwrap_or(oldest);
        motion_between(oldest, newest)
    }

    pub fn velocity(&self) -> Vec2 {
        self.motion.velocity
    }

    pub fn wrist_flick_velocity(&self) -> f32 {
        self.motion.wrist_flick
    }

    pub fn reset(&mut self) {
        *self = Default::default();
    }

    fn update_motion(&mut self, sample: &GestureSample) {
        let (Some(palm), Some(wrist_angle)) = (sample.palm_center(), sample.wrist_angle()) else {
            self.history.clear();
            self.motion = MotionSample::default();
            return;
        };

        // Degenerate landmarks keep the previous estimate.
        if !palm.is_finite() || !wrist_angle.is_finite() {
            return;
        }

        self.history.push_back(MotionPoint {
            timestamp: sample.timestamp,
            palm,
            wrist_angle,
        });
        while self.history.len() > 2
            && sample.timestamp - self.history[0].timestamp > MOTION_WINDOW
        {
            self.history.pop_front();
        }

        if let (Some(oldest), Some(newest)) = (self.history.front(), self.history.back()) {
            self.motion = motion_between(oldest, newest);
        }
    }
}

fn motion_between(oldest: &MotionPoint, newest: &MotionPoint) -> MotionSample {
    let dt = (newest.timestamp - oldest.timestamp) as f32;
    if dt <= 1e-4 {
        return MotionSample::default();
    }

    let rotation = wrap_angle(newest.wrist_angle - oldest.wrist_angle);
    MotionSample {
        velocity: (newest.palm - oldest.palm) / dt,
        wrist_flick: rotation.abs() / dt,
    }
}

fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}

/// Build a plausible set of hand landmarks with the palm centred on `palm` and a wrist to middle
/// knuckle distance of `size`, rotated by `angle` in the image plane. Handy for simulators and tests.
pub fn synthetic_hand(palm: Vec2, size: f32, angle: f32) -> Vec<Vec3> {
    let (sin, cos) = angle.sin_cos();
    let rotate = |p: Vec2| Vec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos);

    // Canonical hand pointing "up" the image (negative y), wrist at the origin, unit size.
    let mut canonical = [Vec2::ZERO; HAND_LANDMARK_COUNT];
    for (i, point) in canonical.iter_mut().enumerate() {
        let finger = (i.saturating_sub(1)) / 4;
        let joint = (i.saturating_sub(1)) % 4;
        let x = (finger as f32 - 2.0) * 0.25;
        let y = -0.6 - joint as f32 * 0.3;
        *point = Vec2::new(x, y);
    }
    canonical[WRIST] = Vec2::ZERO;
    canonical[INDEX_MCP] = Vec2::new(-0.25, -0.9);
    canonical[MIDDLE_MCP] = Vec2::new(0.0, -1.0);
    canonical[PINKY_MCP] = Vec2::new(0.5, -0.9);

    // The palm centre is the mean of the wrist, index and pinky knuckles.
    let canonical_palm = (canonical[WRIST] + canonical[INDEX_MCP] + canonical[PINKY_MCP]) / 3.0;

    canonical
        .iter()
        .map(|p| {
            let local = rotate((*p - canonical_palm) * size);
            (palm + local).extend(0.0)
        })
        .collect()
}
