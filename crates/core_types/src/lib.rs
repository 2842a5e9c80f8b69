use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod error;

pub use error::{
    CompletionError, ConfigurationError, KnowledgeFetchError, SpeechCapability,
    VoiceRuntimeError, VoiceUnsupportedError,
};

pub type MessageId = Uuid;

/// Maximum number of prior messages sent to the model with each request.
pub const CONTEXT_WINDOW: usize = 10;

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Hi,
    Mr,
    Te,
    Ta,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::En,
        Language::Hi,
        Language::Mr,
        Language::Te,
        Language::Ta,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "hi" => Some(Self::Hi),
            "mr" => Some(Self::Mr),
            "te" => Some(Self::Te),
            "ta" => Some(Self::Ta),
            _ => None,
        }
    }

    /// Unmapped codes resolve to English.
    pub fn from_code_lossy(code: &str) -> Self {
        Self::from_code(code).unwrap_or_default()
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Mr => "mr",
            Self::Te => "te",
            Self::Ta => "ta",
        }
    }

    /// Locale tag handed to the platform speech capabilities.
    pub fn locale_tag(self) -> &'static str {
        match self {
            Self::En => "en-US",
            Self::Hi => "hi-IN",
            Self::Mr => "mr-IN",
            Self::Te => "te-IN",
            Self::Ta => "ta-IN",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "हिंदी",
            Self::Mr => "मराठी",
            Self::Te => "తెలుగు",
            Self::Ta => "தமிழ்",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub language: Language,
}

impl Message {
    pub fn user(text: impl Into<String>, language: Language) -> Self {
        Self::new(Sender::User, text, language)
    }

    pub fn assistant(text: impl Into<String>, language: Language) -> Self {
        Self::new(Sender::Assistant, text, language)
    }

    fn new(sender: Sender, text: impl Into<String>, language: Language) -> Self {
        Self {
            id: MessageId::new_v4(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            language,
        }
    }

    pub fn to_turn(&self) -> ChatTurn {
        ChatTurn {
            role: match self.sender {
                Sender::User => ChatRole::User,
                Sender::Assistant => ChatRole::Assistant,
            },
            content: self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl UserContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
        }
    }

    pub fn first_name(&self) -> Option<&str> {
        self.name.split_whitespace().next()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiConfig {
    #[serde(default)]
    pub credential: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_source_ref: Option<String>,
    #[serde(default)]
    pub configured: bool,
}

impl AiConfig {
    /// Builds the config produced by an explicit save. A blank credential rejects
    /// the whole save.
    pub fn from_save(
        credential: impl Into<String>,
        knowledge_source_ref: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let credential = credential.into().trim().to_string();
        if credential.is_empty() {
            return Err(ConfigurationError::MissingCredential);
        }
        let knowledge_source_ref = knowledge_source_ref
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Ok(Self {
            credential,
            knowledge_source_ref,
            configured: true,
        })
    }

    pub fn is_usable(&self) -> bool {
        self.configured && !self.credential.trim().is_empty()
    }
}

/// Seam between the conversation controller and a remote completion endpoint.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn set_grounding_text(&self, text: String);

    async fn respond(
        &self,
        user_text: &str,
        language: Language,
        history: &[ChatTurn],
    ) -> Result<String, CompletionError>;
}

/// Builds a completion backend from a saved AI configuration.
pub trait BackendFactory: Send + Sync {
    fn build(&self, config: &AiConfig) -> Result<Arc<dyn CompletionBackend>, ConfigurationError>;
}

/// Receives assistant replies that should be read aloud.
pub trait SpeechPlayback: Send + Sync {
    fn play(&self, text: &str, language: Language);
}
