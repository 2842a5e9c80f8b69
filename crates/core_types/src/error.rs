use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("completion credential is missing")]
    MissingCredential,
    #[error("invalid completion endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("invalid request header {name}")]
    InvalidHeader { name: String },
}

/// Failure of a single completion round trip. `status` is absent when the request
/// never produced an HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("completion failed (status {}): {detail}", .status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
pub struct CompletionError {
    pub status: Option<u16>,
    pub detail: String,
}

impl CompletionError {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            detail: detail.into(),
        }
    }

    pub fn http(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KnowledgeFetchError {
    #[error("unsupported knowledge source: {0}")]
    InvalidSourceRef(String),
    #[error("knowledge source returned status {status}")]
    Http { status: u16 },
    #[error("knowledge fetch failed: {0}")]
    Network(String),
    #[error("knowledge source returned an empty document")]
    EmptyDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeechCapability {
    Recognition,
    Synthesis,
}

impl std::fmt::Display for SpeechCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recognition => f.write_str("speech recognition"),
            Self::Synthesis => f.write_str("speech synthesis"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("voice features not supported: missing {}", .missing.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
pub struct VoiceUnsupportedError {
    pub missing: Vec<SpeechCapability>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VoiceRuntimeError {
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("no speech detected")]
    NoSpeech,
    #[error("speech service network error")]
    Network,
    #[error("audio capture failed")]
    AudioCapture,
    #[error("recognition aborted")]
    Aborted,
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("recognition error: {0}")]
    Other(String),
}

impl VoiceRuntimeError {
    /// Maps a platform recognition error code onto the runtime taxonomy.
    pub fn from_platform_code(code: &str) -> Self {
        match code {
            "not-allowed" | "service-not-allowed" => Self::PermissionDenied,
            "no-speech" => Self::NoSpeech,
            "network" => Self::Network,
            "audio-capture" => Self::AudioCapture,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_string()),
        }
    }
}
