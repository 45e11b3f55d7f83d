#![allow(missing_docs)]
pub mod aim_assist;
pub mod camera_control;
pub mod hold;
pub mod physics;
pub mod throw;

pub use aim_assist::{AimAssist, AimAssistMode, AimCandidate};
pub use camera_control::{camera_control_system, CameraControlState};
pub use hold::{hold_system, DropReason, HoldMode, HoldState};
pub use physics::physics_system;
