/// Marks the entity the hold controller may pick up.
///
/// The radius is used for the hover test, for keeping the object inside the room and for keeping
/// the hold target away from the walls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grabbable {
    /// Radius of the object's bounding ball
    pub radius: f32,
}

impl Default for Grabbable {
    fn default() -> Self {
        Self { radius: 0.35 }
    }
}
