use core_types::VoiceRuntimeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub locale: &'static str,
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognitionConfig {
    /// Single-utterance recognition with partial results.
    pub fn single_utterance(locale: &'static str) -> Self {
        Self {
            locale,
            continuous: false,
            interim_results: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: u64,
    pub text: String,
    pub locale: &'static str,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn final_result(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

/// Callbacks delivered by the platform recognizer, in platform order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Result {
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
    Error {
        code: String,
    },
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    Started { id: u64 },
    Ended { id: u64 },
    Error { id: u64, code: String },
}

pub trait SpeechRecognizer: Send {
    fn configure(&mut self, config: RecognitionConfig);
    fn start(&mut self) -> Result<(), VoiceRuntimeError>;
    /// Requests a graceful stop; the platform still reports `End`.
    fn stop(&mut self);
    fn abort(&mut self);
}

pub trait SpeechSynthesizer: Send {
    fn speak(&mut self, utterance: Utterance) -> Result<(), VoiceRuntimeError>;
    fn cancel(&mut self);
}

pub trait AudioCapture: Send {
    fn open(&mut self) -> Result<Box<dyn LevelMeter>, VoiceRuntimeError>;
}

/// Frequency analyser over an open microphone stream.
pub trait LevelMeter: Send {
    fn frequency_data(&mut self, bins: &mut [u8]);
    fn release(&mut self);
}

/// Whatever speech support the host platform offers. Recognition and synthesis
/// are required; capture is optional.
#[derive(Default)]
pub struct VoiceCapabilities {
    pub recognizer: Option<Box<dyn SpeechRecognizer>>,
    pub synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    pub capture: Option<Box<dyn AudioCapture>>,
}

impl VoiceCapabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_recognizer(mut self, recognizer: impl SpeechRecognizer + 'static) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: impl SpeechSynthesizer + 'static) -> Self {
        self.synthesizer = Some(Box::new(synthesizer));
        self
    }

    pub fn with_capture(mut self, capture: impl AudioCapture + 'static) -> Self {
        self.capture = Some(Box::new(capture));
        self
    }
}
