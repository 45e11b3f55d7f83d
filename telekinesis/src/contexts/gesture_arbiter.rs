/// Shared between the hold controller and the gesture camera controller so they never both act
/// on the same gesture stream in the same frame.
///
/// The hold controller reports whether it is manipulating the object each frame; the camera
/// controller reads that report and backs off while it is set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GestureArbiter {
    manipulating: bool,
}

impl GestureArbiter {
    pub fn report_manipulation(&mut self, manipulating: bool) {
        self.manipulating = manipulating;
    }

    pub fn is_manipulating(&self) -> bool {
        self.manipulating
    }

    pub fn reset(&mut self) {
        self.manipulating = false;
    }
}
