/// A flag that reports a transition to exactly one snapshot.
///
/// The simulation raises it; the snapshot writer reads it with [`EventFlag::take`],
/// which clears it so the next snapshot reports `false` again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFlag(bool);

impl EventFlag {
    pub fn raised() -> Self {
        EventFlag(true)
    }

    pub fn raise(&mut self) {
        self.0 = true;
    }

    pub fn is_raised(&self) -> bool {
        self.0
    }

    /// Returns the current state and clears it.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.0)
    }
}
