use glam::Vec3;
use hecs::{Entity, World};

use crate::{
    components::{Anchor, AnchorId, Info, LocalTransform},
    config::AimAssistConfig,
    util::smoothing_alpha,
};

/// Spawn an aim assist anchor at `position`.
pub fn add_anchor(world: &mut World, id: u32, position: Vec3) -> Entity {
    world.spawn((
        Info::new(format!("Anchor {id}")),
        Anchor::new(id),
        LocalTransform::from_translation(position),
    ))
}

/// Collect every anchor in the world as an aim assist candidate.
pub fn gather_candidates(world: &World, candidates: &mut Vec<AimCandidate>) {
    candidates.clear();
    candidates.extend(
        world
            .query::<(&Anchor, &LocalTransform)>()
            .iter()
            .map(|(_, (anchor, transform))| AimCandidate {
                id: anchor.id,
                position: transform.translation,
            }),
    );
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimCandidate {
    pub id: AnchorId,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AimAssistMode {
    #[default]
    Idle,
    /// A candidate is inside the acquire radius but has not been there long enough to lock
    Acquired,
    Locked,
}

/// Nudges a target position towards a nearby anchor.
///
/// This is purely a transform on a value: it never decides whether the caller's logic runs.
/// Its state persists across grabs and drops and is only cleared by [`AimAssist::reset`].
#[derive(Debug, Clone)]
pub struct AimAssist {
    config: AimAssistConfig,
    pub mode: AimAssistMode,
    pub locked_target_id: Option<AnchorId>,
    pub locked_target_position: Vec3,
    /// Time at which the current acquire or lock began, on the aim assist's own clock
    pub lock_start_time: f64,
    pub current_strength: f32,
    clock: f64,
    // A candidate whose lock timed out; it may not be re-acquired until it leaves the release radius.
    expired_target_id: Option<AnchorId>,
}

impl AimAssist {
    pub fn new(config: AimAssistConfig) -> Self {
        Self {
            config,
            mode: AimAssistMode::Idle,
            locked_target_id: None,
            locked_target_position: Vec3::ZERO,
            lock_start_time: 0.0,
            current_strength: 0.0,
            clock: 0.0,
            expired_target_id: None,
        }
    }

    /// Adjust `raw_target` towards the best candidate. `dt` is the frame time in seconds.
    pub fn apply(&mut self, raw_target: Vec3, candidates: &[AimCandidate], dt: f32) -> Vec3 {
        self.clock += dt.max(0.0) as f64;

        if candidates.is_empty() {
            self.release_lock();
            return raw_target;
        }
        if !self.config.enabled || !raw_target.is_finite() {
            return raw_target;
        }

        let release_radius = self.config.release_radius;
        let distance_to = |c: &AimCandidate| c.position.distance(raw_target);
        let find = |id: AnchorId| candidates.iter().find(|c| c.id == id);

        if let Some(expired) = self.expired_target_id {
            let still_close = find(expired).map_or(false, |c| distance_to(c) <= release_radius);
            if !still_close {
                self.expired_target_id = None;
            }
        }

        let Some(nearest_distance) = candidates
            .iter()
            .map(distance_to)
            .filter(|d| d.is_finite())
            .min_by(|a, b| a.total_cmp(b))
        else {
            self.release_lock();
            return raw_target;
        };

        match self.mode {
            AimAssistMode::Idle => self.try_acquire(raw_target, candidates),
            AimAssistMode::Acquired | AimAssistMode::Locked => {
                match self.locked_target_id.and_then(find) {
                    Some(tracked) if distance_to(tracked) <= release_radius => {
                        self.locked_target_position = tracked.position;
                        self.advance_lock(distance_to(tracked));
                    }
                    _ => {
                        log::debug!("[TELEKINESIS_AIM] Target lost, releasing lock");
                        self.release_lock();
                    }
                }
            }
        }

        let goal_strength = if self.mode == AimAssistMode::Locked {
            let distance = self.locked_target_position.distance(raw_target);
            self.config.max_strength * (1.0 - distance / release_radius).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.current_strength += (goal_strength - self.current_strength)
            * smoothing_alpha(dt, self.config.strength_time_constant);
        self.current_strength = self.current_strength.clamp(0.0, self.config.max_strength);

        if self.locked_target_id.is_none() || self.current_strength <= 0.0 {
            return raw_target;
        }

        let displacement = ((self.locked_target_position - raw_target) * self.current_strength)
            .clamp_length_max(self.config.max_strength * nearest_distance);
        raw_target + displacement
    }

    fn try_acquire(&mut self, raw_target: Vec3, candidates: &[AimCandidate]) {
        let nearest = candidates
            .iter()
            .filter(|c| Some(c.id) != self.expired_target_id)
            .map(|c| (c, c.position.distance(raw_target)))
            .filter(|(_, d)| d.is_finite())
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        if let Some((candidate, distance)) = nearest {
            if distance <= self.config.acquire_radius {
                log::debug!("[TELEKINESIS_AIM] Acquired {:?}", candidate.id);
                self.mode = AimAssistMode::Acquired;
                self.locked_target_id = Some(candidate.id);
                self.locked_target_position = candidate.position;
                self.lock_start_time = self.clock;
            }
        }
    }

    fn advance_lock(&mut self, distance: f32) {
        let elapsed = self.clock - self.lock_start_time;
        match self.mode {
            AimAssistMode::Acquired if distance > self.config.acquire_radius => {
                // Drifted between the two radii: the dwell starts over.
                self.lock_start_time = self.clock;
            }
            AimAssistMode::Acquired if elapsed >= self.config.acquire_dwell as f64 => {
                log::debug!("[TELEKINESIS_AIM] Locked {:?}", self.locked_target_id);
                self.mode = AimAssistMode::Locked;
                self.lock_start_time = self.clock;
            }
            AimAssistMode::Locked if elapsed > self.config.max_lock_duration as f64 => {
                log::debug!("[TELEKINESIS_AIM] Lock on {:?} timed out", self.locked_target_id);
                self.expired_target_id = self.locked_target_id;
                self.release_lock();
            }
            _ => {}
        }
    }

    /// Drop any acquire or lock, leaving the rest of the state alone.
    pub fn release_lock(&mut self) {
        self.mode = AimAssistMode::Idle;
        self.locked_target_id = None;
        self.current_strength = 0.0;
    }

    /// Clear everything. Called when the feature is powered off.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn candidate(id: u32, position: Vec3) -> AimCandidate {
        AimCandidate {
            id: AnchorId(id),
            position,
        }
    }

    fn locked_aim_assist(raw: Vec3, candidates: &[AimCandidate]) -> AimAssist {
        let mut aim_assist = AimAssist::new(AimAssistConfig::default());
        for _ in 0..20 {
            aim_assist.apply(raw, candidates, 0.016);
        }
        assert_eq!(aim_assist.mode, AimAssistMode::Locked);
        aim_assist
    }

    #[test]
    fn test_empty_candidates_return_raw_and_clear_lock() {
        let raw = Vec3::new(0.0, 1.0, -5.0);
        let candidates = [candidate(1, Vec3::new(0.5, 1.0, -5.0))];
        let mut aim_assist = locked_aim_assist(raw, &candidates);

        let adjusted = aim_assist.apply(raw, &[], 0.016);
        assert_eq!(adjusted, raw);
        assert_eq!(aim_assist.mode, AimAssistMode::Idle);
        assert_eq!(aim_assist.locked_target_id, None);
    }

    #[test]
    fn test_acquire_then_lock_pulls_towards_candidate() {
        let raw = Vec3::new(0.0, 1.0, -5.0);
        let target = Vec3::new(1.0, 1.0, -5.0);
        let candidates = [candidate(7, target), candidate(8, Vec3::new(10.0, 1.0, -5.0))];
        let mut aim_assist = AimAssist::new(AimAssistConfig::default());

        let adjusted = aim_assist.apply(raw, &candidates, 0.016);
        assert_eq!(aim_assist.mode, AimAssistMode::Acquired);
        assert_eq!(aim_assist.locked_target_id, Some(AnchorId(7)));
        assert_eq!(adjusted, raw);

        for _ in 0..10 {
            aim_assist.apply(raw, &candidates, 0.016);
        }
        assert_eq!(aim_assist.mode, AimAssistMode::Locked);
        let adjusted = aim_assist.apply(raw, &candidates, 0.016);
        assert!(adjusted.x > raw.x);
        assert!(adjusted.x < target.x);
        assert_relative_eq!(adjusted.y, raw.y);
    }

    #[test]
    fn test_release_radius_hysteresis() {
        let target = Vec3::ZERO;
        let candidates = [candidate(1, target)];
        let mut aim_assist = locked_aim_assist(Vec3::new(1.0, 0.0, 0.0), &candidates);

        // Between the acquire (1.5) and release (2.5) radii: stays locked.
        aim_assist.apply(Vec3::new(2.0, 0.0, 0.0), &candidates, 0.016);
        assert_eq!(aim_assist.mode, AimAssistMode::Locked);

        // Beyond the release radius: released.
        aim_assist.apply(Vec3::new(3.0, 0.0, 0.0), &candidates, 0.016);
        assert_eq!(aim_assist.mode, AimAssistMode::Idle);

        // Back between the radii: not close enough to re-acquire.
        aim_assist.apply(Vec3::new(2.0, 0.0, 0.0), &candidates, 0.016);
        assert_eq!(aim_assist.mode, AimAssistMode::Idle);
    }

    #[test]
    fn test_lock_times_out_and_is_not_reacquired_until_released() {
        let raw = Vec3::new(0.5, 0.0, 0.0);
        let candidates = [candidate(1, Vec3::ZERO)];
        let mut aim_assist = locked_aim_assist(raw, &candidates);

        // Hold the lock past its maximum duration.
        for _ in 0..300 {
            aim_assist.apply(raw, &candidates, 0.016);
        }
        assert_eq!(aim_assist.mode, AimAssistMode::Idle);
        assert_eq!(aim_assist.apply(raw, &candidates, 0.016), raw);

        // Leaving the release radius allows it to be acquired again.
        aim_assist.apply(Vec3::new(5.0, 0.0, 0.0), &candidates, 0.016);
        aim_assist.apply(raw, &candidates, 0.016);
        assert_eq!(aim_assist.mode, AimAssistMode::Acquired);
    }

    #[test]
    fn test_displacement_is_bounded() {
        let config = AimAssistConfig::default();
        let max_strength = config.max_strength;
        let mut aim_assist = AimAssist::new(config);
        let candidates = [
            candidate(1, Vec3::new(0.0, 0.0, 0.0)),
            candidate(2, Vec3::new(1.2, 0.3, 0.0)),
        ];

        for i in 0..400 {
            let t = i as f32 * 0.05;
            let raw = Vec3::new(t.sin() * 2.0, (t * 0.7).cos(), (t * 1.3).sin() * 0.5);
            let nearest = candidates
                .iter()
                .map(|c| c.position.distance(raw))
                .fold(f32::INFINITY, f32::min);
            let adjusted = aim_assist.apply(raw, &candidates, 0.016);
            assert!(adjusted.distance(raw) <= max_strength * nearest + 1e-5);
        }
    }

    #[test]
    fn test_vanished_target_releases_lock() {
        let raw = Vec3::ZERO;
        let mut aim_assist = locked_aim_assist(raw, &[candidate(1, Vec3::X)]);
        aim_assist.apply(raw, &[candidate(2, Vec3::new(0.0, 5.0, 0.0))], 0.016);
        assert_eq!(aim_assist.mode, AimAssistMode::Idle);
        assert_eq!(aim_assist.locked_target_id, None);
    }

    #[test]
    fn test_gather_candidates() {
        let mut world = World::default();
        add_anchor(&mut world, 3, Vec3::new(1.0, 2.0, 3.0));
        let mut candidates = vec![];
        gather_candidates(&world, &mut candidates);
        assert_eq!(candidates, vec![candidate(3, Vec3::new(1.0, 2.0, 3.0))]);
    }
}
