//! Voice session states. Listening and speaking never overlap: the only way
//! between them is through `Idle`.
//!
//! - Idle -> Initializing (recognition requested)
//! - Initializing -> Listening (platform reported start)
//! - Initializing | Listening -> Idle (end, error, abort)
//! - Idle -> Speaking -> Idle

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VoiceState {
    #[default]
    Idle,
    Initializing,
    Listening,
    Speaking,
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceState::Idle => write!(f, "Idle"),
            VoiceState::Initializing => write!(f, "Initializing"),
            VoiceState::Listening => write!(f, "Listening"),
            VoiceState::Speaking => write!(f, "Speaking"),
        }
    }
}

impl VoiceState {
    pub fn can_transition_to(&self, target: &VoiceState) -> bool {
        matches!(
            (self, target),
            (VoiceState::Idle, VoiceState::Initializing)
                | (VoiceState::Initializing, VoiceState::Listening)
                | (VoiceState::Initializing, VoiceState::Idle)
                | (VoiceState::Listening, VoiceState::Idle)
                | (VoiceState::Idle, VoiceState::Speaking)
                | (VoiceState::Speaking, VoiceState::Idle)
        )
    }

    /// Recognition has been requested and not yet finished.
    pub fn is_capturing(&self) -> bool {
        matches!(self, VoiceState::Initializing | VoiceState::Listening)
    }
}
