#![deny(missing_docs)]

//! Telekinesis turns a noisy stream of hand gesture classifications into stable, physically
//! plausible control of a single object in a real-time 3D scene.
//!
//! The classifier runs out-of-band at its own, lower rate. Once per rendered frame the host calls
//! [`Engine::tick`], which runs ambient physics, the hold controller and the gesture camera
//! controller, in that order. The hold controller and the camera controller share the gesture
//! channel through a [`contexts::GestureArbiter`] so they never both act on the same gesture.
//!
//! # Getting started
//! ```no_run
//! use std::time::Duration;
//! use telekinesis::{contexts::gesture_context::GestureSample, EngineBuilder};
//!
//! let mut engine = EngineBuilder::new().build();
//! engine.spawn_classifier(|_now: f64| -> Option<GestureSample> { None }, Duration::from_millis(50));
//! loop {
//!     engine.tick(1.0 / 60.0);
//! }
//! ```

pub use engine::{Engine, EngineBuilder};
pub use glam;
pub use hecs;
pub use rapier3d;
pub use telekinesis_error::TelekinesisError;

/// Components are data attached to the entities in the scene: the object, the camera and the anchors
pub mod components;
/// Tunables
pub mod config;
/// Contexts are state shared between systems
pub mod contexts;
mod engine;
/// Systems are functions called each frame to update the simulation
pub mod systems;
mod telekinesis_error;
/// Kitchen sink utility functions
pub mod util;
/// Background threads feeding the engine
pub mod workers;

pub use engine::{PerformanceTimers, MAX_FRAME_TIME};

/// Telekinesis result type
pub type TelekinesisResult<T> = std::result::Result<T, TelekinesisError>;
