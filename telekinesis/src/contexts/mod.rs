#![allow(missing_docs)]

pub mod gesture_arbiter;
pub mod gesture_context;
pub mod physics_context;

pub use gesture_arbiter::GestureArbiter;
pub use gesture_context::GestureContext;
pub use physics_context::{PhysicsContext, RoomBounds};
