use std::time::Duration;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use telekinesis::{
    contexts::gesture_context::{synthetic_hand, Gesture, GestureSample},
    glam::Vec2,
    workers::GestureClassifier,
};

/// Total length of the scripted session
pub const SCRIPT_LENGTH: Duration = Duration::from_secs(9);

const ALL_GESTURES: [Gesture; 5] = [
    Gesture::OpenHand,
    Gesture::ClosedFist,
    Gesture::Pinch,
    Gesture::TwoFinger,
    Gesture::ThreeFinger,
];

/// What the player's hand is doing at some point in the script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub gesture: Gesture,
    pub palm: Vec2,
    pub size: f32,
    pub angle: f32,
}

impl Pose {
    fn new(gesture: Gesture, palm: Vec2, size: f32) -> Self {
        Self {
            gesture,
            palm,
            size,
            angle: 0.0,
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// The hand pose `t` seconds into the script, or `None` if no hand is in view.
pub fn pose_at(t: f64) -> Option<Pose> {
    let centre = Vec2::new(0.5, 0.5);
    let t = t as f32;
    match t {
        // Look at the crate with an open hand
        t if t < 0.6 => Some(Pose::new(Gesture::OpenHand, centre, 0.2)),
        // Grab it and drift to the right
        t if t < 2.0 => {
            let x = lerp(0.5, 0.58, (t - 0.6) / 1.4);
            Some(Pose::new(Gesture::ClosedFist, Vec2::new(x, 0.5), 0.2))
        }
        // Push it away
        t if t < 3.0 => {
            let size = lerp(0.2, 0.25, t - 2.0);
            Some(Pose::new(Gesture::ClosedFist, Vec2::new(0.58, 0.5), size))
        }
        // Hold still, then freeze for a moment
        t if t < 3.4 => Some(Pose::new(Gesture::ClosedFist, Vec2::new(0.58, 0.5), 0.25)),
        t if t < 3.8 => Some(Pose::new(Gesture::TwoFinger, Vec2::new(0.4, 0.6), 0.25)),
        t if t < 4.2 => Some(Pose::new(Gesture::ClosedFist, Vec2::new(0.4, 0.6), 0.25)),
        // Underhand swipe: throw
        t if t < 4.4 => {
            let y = lerp(0.6, 0.2, (t - 4.2) / 0.2);
            Some(Pose::new(Gesture::ClosedFist, Vec2::new(0.4, y), 0.25))
        }
        // Hand out of view while the crate flies
        t if t < 5.5 => None,
        // Turn the camera with three fingers
        t if t < 7.0 => {
            let x = lerp(0.5, 0.35, (t - 5.5) / 1.5);
            Some(Pose::new(Gesture::ThreeFinger, Vec2::new(x, 0.5), 0.2))
        }
        t if t < 7.5 => Some(Pose::new(Gesture::OpenHand, centre, 0.2)),
        _ => None,
    }
}

/// How badly the fake classifier behaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Noise {
    /// Chance of reporting a random label instead of the real one
    pub misclassify_probability: f64,
    /// Chance of losing the hand for one sample
    pub dropout_probability: f64,
    /// Landmark jitter, in normalised image units
    pub jitter: f32,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            misclassify_probability: 0.05,
            dropout_probability: 0.03,
            jitter: 0.002,
        }
    }
}

impl Noise {
    pub fn none() -> Self {
        Self {
            misclassify_probability: 0.0,
            dropout_probability: 0.0,
            jitter: 0.0,
        }
    }
}

/// A stand-in for a real camera based classifier: follows the script and adds noise.
pub struct ScriptedClassifier {
    rng: StdRng,
    noise: Noise,
}

impl ScriptedClassifier {
    pub fn new(seed: u64, noise: Noise) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise,
        }
    }
}

impl GestureClassifier for ScriptedClassifier {
    fn classify(&mut self, now: f64) -> Option<GestureSample> {
        let no_hand = GestureSample::new(Gesture::None, vec![], now);
        let Some(pose) = pose_at(now) else {
            return Some(no_hand);
        };
        if self.rng.gen_bool(self.noise.dropout_probability) {
            return Some(no_hand);
        }

        let gesture = if self.rng.gen_bool(self.noise.misclassify_probability) {
            *ALL_GESTURES.choose(&mut self.rng).unwrap_or(&pose.gesture)
        } else {
            pose.gesture
        };

        let jitter = self.noise.jitter;
        let mut landmarks = synthetic_hand(pose.palm, pose.size, pose.angle);
        if jitter > 0.0 {
            for landmark in &mut landmarks {
                landmark.x += self.rng.gen_range(-jitter..=jitter);
                landmark.y += self.rng.gen_range(-jitter..=jitter);
            }
        }

        Some(GestureSample::new(gesture, landmarks, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script() {
        assert_eq!(pose_at(0.1).unwrap().gesture, Gesture::OpenHand);
        assert_eq!(pose_at(1.0).unwrap().gesture, Gesture::ClosedFist);
        assert_eq!(pose_at(3.6).unwrap().gesture, Gesture::TwoFinger);
        assert!(pose_at(5.0).is_none());
        assert_eq!(pose_at(6.0).unwrap().gesture, Gesture::ThreeFinger);
        assert!(pose_at(SCRIPT_LENGTH.as_secs_f64()).is_none());
    }

    #[test]
    fn test_noiseless_classifier_follows_script() {
        let mut classifier = ScriptedClassifier::new(1, Noise::none());
        let sample = classifier.classify(1.0).unwrap();
        assert_eq!(sample.gesture, Gesture::ClosedFist);
        assert!(sample.hand_present());
        assert_eq!(sample.timestamp, 1.0);

        let sample = classifier.classify(5.0).unwrap();
        assert!(!sample.hand_present());
    }

    #[test]
    fn test_same_seed_same_samples() {
        let mut a = ScriptedClassifier::new(42, Noise::default());
        let mut b = ScriptedClassifier::new(42, Noise::default());
        for i in 0..100 {
            let t = i as f64 * 0.04;
            assert_eq!(a.classify(t), b.classify(t));
        }
    }
}
