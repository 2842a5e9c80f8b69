use core_types::{VoiceRuntimeError, VoiceUnsupportedError};
use thiserror::Error;

mod level;
mod platform;
mod session;
mod state;

pub use platform::{
    AudioCapture, LevelMeter, RecognitionConfig, RecognitionEvent, RecognitionResult,
    SpeechRecognizer, SpeechSynthesizer, SynthesisEvent, Utterance, VoiceCapabilities,
};
pub use session::{SharedVoiceSession, SpeechParams, VoiceEvent, VoiceSession};
pub use state::VoiceState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error(transparent)]
    Unsupported(#[from] VoiceUnsupportedError),
    #[error(transparent)]
    Runtime(#[from] VoiceRuntimeError),
    #[error("already listening")]
    AlreadyListening,
    #[error("voice session is closed")]
    Closed,
}
