/// Identifies an aim assist anchor. Owned by whichever system spawned the anchor (eg. a scoring target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(
    /// Raw identifier, chosen by the host
    pub u32,
);

/// A point the held object is gently pulled towards when it gets close.
///
/// The anchor's position is its [`super::LocalTransform`]'s translation, which its owner may move every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Identifies this anchor in aim assist logs and locks
    pub id: AnchorId,
}

impl Anchor {
    /// Create an anchor with the given identifier
    pub fn new(id: u32) -> Self {
        Self { id: AnchorId(id) }
    }
}
