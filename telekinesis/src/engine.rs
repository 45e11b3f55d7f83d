use std::time::{Duration, Instant};

use glam::Vec3;

use crate::{
    components::Camera,
    config::TelekinesisConfig,
    contexts::{gesture_context::GestureSample, GestureArbiter, GestureContext, PhysicsContext},
    systems::{
        aim_assist::add_anchor,
        camera_control::add_camera,
        camera_control_system,
        hold::{force_release, DropReason},
        hold_system,
        physics::add_grabbable_object,
        physics_system, AimAssist, CameraControlState, HoldMode, HoldState,
    },
    workers::{GestureClassifier, Workers},
    TelekinesisError,
};

/// Frames longer than this are simulated as if they took this long
pub const MAX_FRAME_TIME: f32 = 0.1;

/// Builder for `Engine`.
pub struct EngineBuilder {
    config: TelekinesisConfig,
    object_name: String,
    object_position: Vec3,
    object_mass: f32,
    object_radius: f32,
    camera_position: Vec3,
    camera: Camera,
    anchors: Vec<(u32, Vec3)>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Default::default(),
            object_name: "Object".to_string(),
            object_position: Vec3::new(0.0, 1.6, -6.0),
            object_mass: 1.0,
            object_radius: 0.35,
            camera_position: Vec3::new(0.0, 1.6, 0.0),
            camera: Default::default(),
            anchors: Vec::new(),
        }
    }
}

impl EngineBuilder {
    /// Create an `EngineBuilder`
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the configuration. It is normalised when the engine is built.
    pub fn config(&mut self, config: TelekinesisConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Describe the object the player can pick up
    pub fn object(&mut self, name: &str, position: Vec3, mass: f32, radius: f32) -> &mut Self {
        self.object_name = name.to_string();
        self.object_position = position;
        self.object_mass = mass;
        self.object_radius = radius;
        self
    }

    /// Set the camera's starting pose
    pub fn camera(&mut self, position: Vec3, camera: Camera) -> &mut Self {
        self.camera_position = position;
        self.camera = camera;
        self
    }

    /// Add an aim assist anchor
    pub fn anchor(&mut self, id: u32, position: Vec3) -> &mut Self {
        self.anchors.push((id, position));
        self
    }

    /// Build the `Engine`
    pub fn build(&self) -> Engine {
        let config = self.config.clone().normalized();

        let mut world = hecs::World::default();
        let object_entity = add_grabbable_object(
            &mut world,
            &self.object_name,
            self.object_position,
            self.object_mass,
            self.object_radius,
        );
        let camera_entity = add_camera(&mut world, self.camera_position, self.camera);
        for (id, position) in &self.anchors {
            add_anchor(&mut world, *id, *position);
        }

        Engine {
            world,
            physics_context: PhysicsContext::new(&config.physics),
            aim_assist: AimAssist::new(config.aim_assist.clone()),
            config,
            gesture_context: Default::default(),
            hold_state: Default::default(),
            camera_control_state: Default::default(),
            arbiter: Default::default(),
            object_entity,
            camera_entity,
            enabled: true,
            elapsed: 0.0,
            performance_timers: Default::default(),
            workers: None,
        }
    }
}

/// The Telekinesis Engine
/// Owns the scene and every piece of state the systems share.
/// **IMPORTANT**: make sure you call `tick` once per rendered frame
pub struct Engine {
    /// World
    pub world: hecs::World,
    /// Configuration, normalised
    pub config: TelekinesisConfig,
    /// Physics context
    pub physics_context: PhysicsContext,
    /// Gesture context
    pub gesture_context: GestureContext,
    /// Hold controller state
    pub hold_state: HoldState,
    /// Aim assist
    pub aim_assist: AimAssist,
    /// Camera controller state
    pub camera_control_state: CameraControlState,
    /// Who currently owns the gesture channel
    pub arbiter: GestureArbiter,
    /// The grabbable object
    pub object_entity: hecs::Entity,
    /// The camera
    pub camera_entity: hecs::Entity,
    /// Performance timers
    pub performance_timers: PerformanceTimers,
    enabled: bool,
    elapsed: f64,
    workers: Option<Workers>,
}

/// Tick timings, averaged and logged about once a second
#[derive(Debug)]
pub struct PerformanceTimers {
    /// When the current tick started
    pub frame_start: Instant,
    /// Tick durations since the last log line
    pub timings: Vec<Duration>,
    /// When the last log line was written
    pub last_update: Instant,
}

impl PerformanceTimers {
    fn start(&mut self) {
        self.frame_start = Instant::now();
    }

    fn end(&mut self) {
        let now = Instant::now();
        self.timings.push(now - self.frame_start);

        if (now - self.last_update).as_secs_f32() >= 1.0 {
            let total: Duration = self.timings.iter().sum();
            let average = total / self.timings.len().max(1) as u32;
            log::debug!(
                "[TELEKINESIS_PERF] Average tick time: {average:?} over {} ticks",
                self.timings.len()
            );
            self.last_update = now;
            self.timings.clear();
        }
    }
}

impl Default for PerformanceTimers {
    fn default() -> Self {
        Self {
            frame_start: Instant::now(),
            last_update: Instant::now(),
            timings: Default::default(),
        }
    }
}

impl Engine {
    /// Create a new engine with the default scene and configuration
    pub fn new() -> Self {
        EngineBuilder::new().build()
    }

    /// Advance the simulation by one frame of `dt` seconds.
    ///
    /// Runs, in order: ambient physics, the hold controller, the gesture camera controller.
    pub fn tick(&mut self, dt: f32) {
        self.performance_timers.start();
        self.check_for_worker_messages();

        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_TIME)
        } else {
            log::warn!("[TELEKINESIS_ENGINE] Ignoring non-finite frame time {dt}");
            0.0
        };

        if self.enabled {
            physics_system(self, dt);
            hold_system(self, dt);
            camera_control_system(self, dt);
        }

        self.elapsed += dt as f64;
        self.performance_timers.end();
    }

    /// Hand the engine a classifier result directly, for hosts that receive samples by callback.
    pub fn submit_gesture(&mut self, sample: GestureSample) {
        self.gesture_context.receive(sample);
    }

    /// Run `classifier` on a worker thread every `period`. Replaces any classifier already running.
    pub fn spawn_classifier(&mut self, classifier: impl GestureClassifier, period: Duration) {
        // The new classifier has its own clock.
        self.gesture_context.reset();
        self.workers = Some(Workers::new(classifier, period));
    }

    /// Turn the feature on or off. Turning it off drops the object and clears all latched state.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        log::info!("[TELEKINESIS_ENGINE] Telekinesis {}", if enabled { "on" } else { "off" });
        self.enabled = enabled;
        if !enabled {
            self.reset_state(DropReason::PowerOff);
        }
    }

    /// Is the feature on?
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Leaving the room: drop the object and clear latched state, leaving the feature enabled.
    pub fn exit_room(&mut self) {
        log::info!("[TELEKINESIS_ENGINE] Exiting room");
        self.reset_state(DropReason::RoomExit);
    }

    /// What the hold controller is currently doing
    pub fn hold_mode(&self) -> HoldMode {
        self.hold_state.mode
    }

    /// Seconds simulated since the engine was built
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    fn reset_state(&mut self, reason: DropReason) {
        force_release(
            &mut self.world,
            self.object_entity,
            &mut self.hold_state,
            &self.config.hold,
            reason,
        );
        self.aim_assist.reset();
        self.camera_control_state.reset();
        self.arbiter.reset();
        self.gesture_context.reset();
    }

    fn check_for_worker_messages(&mut self) {
        let Some(workers) = &self.workers else {
            return;
        };

        let (latest, disconnected) = workers.drain();
        if let Some(sample) = latest {
            self.gesture_context.receive(sample);
        }
        if disconnected {
            log::warn!("[TELEKINESIS_ENGINE] {}", TelekinesisError::WorkerDisconnected);
            self.workers = None;
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        components::{LocalTransform, RigidBody},
        contexts::gesture_context::{synthetic_hand, Gesture},
    };
    use glam::Vec2;

    fn hand(gesture: Gesture, timestamp: f64) -> GestureSample {
        GestureSample::new(gesture, synthetic_hand(Vec2::new(0.5, 0.5), 0.2, 0.0), timestamp)
    }

    fn grab(engine: &mut Engine) {
        for _ in 0..3 {
            let now = engine.elapsed();
            engine.submit_gesture(hand(Gesture::ClosedFist, now));
            engine.tick(1.0 / 60.0);
        }
        assert_eq!(engine.hold_mode(), HoldMode::Grabbed);
    }

    fn rigid_body(engine: &Engine) -> RigidBody {
        (*engine.world.get::<&RigidBody>(engine.object_entity).unwrap()).clone()
    }

    #[test]
    fn test_builder() {
        let engine = EngineBuilder::new()
            .object("Crate", Vec3::new(1.0, 2.0, -5.0), 3.0, 0.5)
            .anchor(1, Vec3::new(0.0, 1.0, -10.0))
            .anchor(2, Vec3::new(2.0, 1.0, -10.0))
            .build();

        let transform = engine
            .world
            .get::<&LocalTransform>(engine.object_entity)
            .unwrap();
        assert_eq!(transform.translation, Vec3::new(1.0, 2.0, -5.0));
        assert_eq!(rigid_body(&engine).mass, 3.0);
        assert!(engine.world.get::<&Camera>(engine.camera_entity).is_ok());
        assert_eq!(
            engine
                .world
                .query::<&crate::components::Anchor>()
                .iter()
                .count(),
            2
        );
    }

    #[test]
    fn test_grab_and_hold() {
        let mut engine = Engine::new();
        grab(&mut engine);
        assert!(engine.arbiter.is_manipulating());

        for _ in 0..120 {
            let now = engine.elapsed();
            engine.submit_gesture(hand(Gesture::ClosedFist, now));
            engine.tick(1.0 / 60.0);
        }
        assert_eq!(engine.hold_mode(), HoldMode::Grabbed);
        let transform = engine
            .world
            .get::<&LocalTransform>(engine.object_entity)
            .unwrap();
        // Still floating in front of the camera.
        assert!((transform.translation - Vec3::new(0.0, 1.6, -6.0)).length() < 0.1);
    }

    #[test]
    fn test_stale_sample_is_reused() {
        let mut engine = Engine::new();
        grab(&mut engine);

        // No new samples: the last one keeps the hold alive.
        for _ in 0..30 {
            engine.tick(1.0 / 60.0);
        }
        assert_eq!(engine.hold_mode(), HoldMode::Grabbed);
    }

    #[test]
    fn test_power_off_drops_and_clears() {
        let mut engine = Engine::new();
        grab(&mut engine);

        engine.set_enabled(false);
        assert!(!engine.is_enabled());
        assert_eq!(engine.hold_mode(), HoldMode::Idle);
        assert!(!rigid_body(&engine).levitating);
        assert!(!engine.arbiter.is_manipulating());
        assert_eq!(engine.gesture_context.gesture(), Gesture::None);

        // Nothing runs while off.
        let position = engine
            .world
            .get::<&LocalTransform>(engine.object_entity)
            .unwrap()
            .translation;
        engine.tick(0.1);
        assert_eq!(
            engine
                .world
                .get::<&LocalTransform>(engine.object_entity)
                .unwrap()
                .translation,
            position
        );

        engine.set_enabled(true);
        engine.tick(0.1);
        assert!(rigid_body(&engine).linear_velocity.y < 0.0);
    }

    #[test]
    fn test_exit_room_drops_but_stays_enabled() {
        let mut engine = Engine::new();
        grab(&mut engine);

        engine.exit_room();
        assert!(engine.is_enabled());
        assert_eq!(engine.hold_mode(), HoldMode::Idle);
        assert_eq!(engine.hold_state.grab_cooldown, 0.0);
        assert!(!rigid_body(&engine).levitating);
        assert!(!engine.arbiter.is_manipulating());

        // The object can be picked up again straight away.
        grab(&mut engine);
    }

    #[test]
    fn test_camera_gesture_turns_camera() {
        let mut engine = Engine::new();
        for i in 0..30 {
            let now = engine.elapsed();
            let palm = Vec2::new(0.5 - i as f32 * 0.005, 0.5);
            engine.submit_gesture(GestureSample::new(
                Gesture::ThreeFinger,
                synthetic_hand(palm, 0.2, 0.0),
                now,
            ));
            engine.tick(1.0 / 60.0);
        }

        assert!(!engine.arbiter.is_manipulating());
        let camera = *engine.world.get::<&Camera>(engine.camera_entity).unwrap();
        // Hand to the left turns the camera left.
        assert!(camera.yaw > 0.0);
    }

    #[test]
    fn test_internal_fault_drops_object() {
        let mut engine = Engine::new();
        grab(&mut engine);

        engine.world.despawn(engine.camera_entity).unwrap();
        let now = engine.elapsed();
        engine.submit_gesture(hand(Gesture::ClosedFist, now));
        engine.tick(1.0 / 60.0);

        assert_eq!(engine.hold_mode(), HoldMode::Idle);
        assert!(!rigid_body(&engine).levitating);
        assert!(!engine.arbiter.is_manipulating());
    }

    #[test]
    fn test_frame_time_is_sanitised() {
        let mut engine = Engine::new();
        engine.tick(f32::NAN);
        engine.tick(-1.0);
        assert_eq!(engine.elapsed(), 0.0);
        engine.tick(10.0);
        assert_eq!(engine.elapsed(), MAX_FRAME_TIME as f64);
    }

    #[test]
    fn test_classifier_worker() {
        let mut engine = Engine::new();
        engine.spawn_classifier(
            |now: f64| Some(hand(Gesture::OpenHand, now)),
            Duration::from_millis(5),
        );

        let deadline = Instant::now() + Duration::from_secs(2);
        while engine.gesture_context.gesture() != Gesture::OpenHand {
            assert!(Instant::now() < deadline, "no sample arrived");
            std::thread::sleep(Duration::from_millis(5));
            engine.tick(1.0 / 60.0);
        }
    }
}
