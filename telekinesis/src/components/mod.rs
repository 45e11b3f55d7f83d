/// Aim assist targets
pub mod anchor;
/// The player's view
pub mod camera;
/// Marks the object the player can pick up
pub mod grabbable;
/// Names, for logs and debugging
pub mod info;
/// Position and orientation
pub mod local_transform;
/// Simulated physical state
pub mod rigid_body;

pub use anchor::{Anchor, AnchorId};
pub use camera::{Camera, ViewBasis};
pub use grabbable::Grabbable;
pub use info::Info;
pub use local_transform::LocalTransform;
pub use rigid_body::RigidBody;
