/// Recording session state.
///
/// Transitions: Stopped → Recording ⇄ Paused, and both active states
/// collapse to Stopped on stop, cancel, or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    Paused,
    Recording,
    Stopped,
}

impl RecordState {
    /// Numeric code used by state event sinks.
    pub fn code(self) -> u8 {
        match self {
            Self::Paused => 0,
            Self::Recording => 1,
            Self::Stopped => 2,
        }
    }

    pub fn is_paused(self) -> bool {
        matches!(self, Self::Paused)
    }

    pub fn is_recording(self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }
}
