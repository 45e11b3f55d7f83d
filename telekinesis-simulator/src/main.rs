mod script;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::info;
use telekinesis::{
    components::{Camera, LocalTransform},
    config::TelekinesisConfig,
    glam::Vec3,
    systems::HoldMode,
    EngineBuilder,
};

use crate::script::{Noise, ScriptedClassifier, SCRIPT_LENGTH};

const FRAME_TIME: Duration = Duration::from_micros(16_667);
const CLASSIFIER_PERIOD: Duration = Duration::from_millis(40);
const DEFAULT_SEED: u64 = 7;

/// Usage: `telekinesis-simulator [config.json] [seed]`
pub fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => TelekinesisConfig::from_file(&path)
            .with_context(|| format!("Unable to load configuration from {path}"))?,
        None => TelekinesisConfig::default(),
    };
    let seed = args
        .next()
        .map(|s| s.parse::<u64>())
        .transpose()
        .context("The seed must be an unsigned integer")?
        .unwrap_or(DEFAULT_SEED);

    let mut engine = EngineBuilder::new()
        .config(config)
        .object("Crate", Vec3::new(0.0, 1.6, -6.0), 2.0, 0.35)
        .camera(Vec3::new(0.0, 1.6, 0.0), Camera::default())
        .anchor(1, Vec3::new(1.5, 2.5, -9.0))
        .build();
    engine.spawn_classifier(ScriptedClassifier::new(seed, Noise::default()), CLASSIFIER_PERIOD);
    info!("Simulating {SCRIPT_LENGTH:?} with seed {seed}");

    let start = Instant::now();
    let mut last_frame = start;
    let mut mode = engine.hold_mode();
    let mut transitions = 0;
    let mut throws = 0;

    while start.elapsed() < SCRIPT_LENGTH {
        let frame_start = Instant::now();
        let dt = (frame_start - last_frame).as_secs_f32();
        last_frame = frame_start;

        engine.tick(dt);

        let next = engine.hold_mode();
        if next != mode {
            info!(
                "{:.2}s: {mode:?} -> {next:?} (gesture {:?})",
                engine.elapsed(),
                engine.gesture_context.gesture()
            );
            transitions += 1;
            if next == HoldMode::Thrown {
                throws += 1;
            }
            mode = next;
        }

        std::thread::sleep(FRAME_TIME.saturating_sub(frame_start.elapsed()));
    }

    let object = engine
        .world
        .get::<&LocalTransform>(engine.object_entity)?
        .translation;
    let camera = *engine.world.get::<&Camera>(engine.camera_entity)?;
    info!("Done: {transitions} transitions, {throws} throws");
    info!("Object came to rest at {object:.2?}");
    info!("Camera yaw {:.3} pitch {:.3}", camera.yaw, camera.pitch);

    Ok(())
}
