use std::sync::Arc;
use std::time::Duration;

use core_types::{
    AiConfig, BackendFactory, CONTEXT_WINDOW, ChatTurn, CompletionBackend, ConfigurationError,
    Language, Message, SpeechPlayback, UserContext,
};
use knowledge::KnowledgeCache;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

mod voice_bridge;

pub use voice_bridge::VoiceBridge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("message is empty")]
    EmptyMessage,
}

/// How the assistant-side message of a send was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Model,
    NotConfigured,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    MessageAppended(Message),
    TypingChanged(bool),
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerTimings {
    pub not_configured_delay: Duration,
    pub auto_speak_delay: Duration,
}

impl Default for ControllerTimings {
    fn default() -> Self {
        Self {
            not_configured_delay: Duration::from_secs(1),
            auto_speak_delay: Duration::from_millis(500),
        }
    }
}

pub struct ConversationController {
    user: UserContext,
    messages: Vec<Message>,
    language: Language,
    ai_config: AiConfig,
    backend: Option<Arc<dyn CompletionBackend>>,
    factory: Arc<dyn BackendFactory>,
    knowledge: Arc<KnowledgeCache>,
    auto_speak: bool,
    playback: Option<Arc<dyn SpeechPlayback>>,
    timings: ControllerTimings,
    events: broadcast::Sender<ConversationEvent>,
}

impl ConversationController {
    pub fn new(
        user: UserContext,
        ai_config: AiConfig,
        factory: Arc<dyn BackendFactory>,
        knowledge: Arc<KnowledgeCache>,
    ) -> Self {
        let backend = if ai_config.configured {
            match factory.build(&ai_config) {
                Ok(backend) => Some(backend),
                Err(err) => {
                    warn!(error = %err, "stored AI configuration is unusable");
                    None
                }
            }
        } else {
            None
        };
        let (events, _) = broadcast::channel(64);
        let mut controller = Self {
            user,
            messages: Vec::new(),
            language: Language::default(),
            ai_config,
            backend,
            factory,
            knowledge,
            auto_speak: false,
            playback: None,
            timings: ControllerTimings::default(),
            events,
        };
        let welcome = i18n::welcome_message(controller.user.first_name());
        controller.append(Message::assistant(welcome, controller.language));
        controller
    }

    pub fn with_timings(mut self, timings: ControllerTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn user(&self) -> &UserContext {
        &self.user
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Affects only the language tag and reply language of later messages.
    pub fn set_language(&mut self, language: Language) {
        if self.language != language {
            info!(from = %self.language, to = %language, "conversation language changed");
            self.language = language;
        }
    }

    pub fn ai_config(&self) -> &AiConfig {
        &self.ai_config
    }

    pub fn is_configured(&self) -> bool {
        self.ai_config.configured && self.backend.is_some()
    }

    /// Replaces the AI configuration and rebuilds the backend. A config the
    /// factory rejects leaves the previous config and backend in place.
    pub fn apply_ai_config(&mut self, config: AiConfig) -> Result<(), ConfigurationError> {
        let backend = if config.configured {
            Some(self.factory.build(&config)?)
        } else {
            None
        };
        info!(
            configured = config.configured,
            has_source = config.knowledge_source_ref.is_some(),
            "AI configuration applied"
        );
        self.ai_config = config;
        self.backend = backend;
        Ok(())
    }

    pub fn auto_speak(&self) -> bool {
        self.auto_speak
    }

    pub fn set_auto_speak(&mut self, enabled: bool) {
        self.auto_speak = enabled;
    }

    pub fn attach_playback(&mut self, playback: Arc<dyn SpeechPlayback>) {
        self.playback = Some(playback);
    }

    pub fn sample_queries(&self) -> &'static [&'static str] {
        i18n::sample_queries(self.language)
    }

    /// The most recent messages as model turns, oldest first.
    pub fn context_window(&self) -> Vec<ChatTurn> {
        let start = self.messages.len().saturating_sub(CONTEXT_WINDOW);
        self.messages[start..].iter().map(Message::to_turn).collect()
    }

    pub async fn send(&mut self, input: &str) -> Result<ReplyKind, SendError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SendError::EmptyMessage);
        }

        let language = self.language;
        let history = self.context_window();
        self.append(Message::user(text, language));
        self.set_typing(true);

        let kind = match self.backend.clone().filter(|_| self.ai_config.configured) {
            None => {
                debug!("AI not configured, replying with notice");
                tokio::time::sleep(self.timings.not_configured_delay).await;
                self.append(Message::assistant(
                    i18n::not_configured_notice(language),
                    language,
                ));
                ReplyKind::NotConfigured
            }
            Some(backend) => {
                let grounding = self
                    .knowledge
                    .grounding_text(self.ai_config.knowledge_source_ref.as_deref())
                    .await;
                backend.set_grounding_text(grounding);
                match backend.respond(text, language, &history).await {
                    Ok(reply) => {
                        self.append(Message::assistant(reply.clone(), language));
                        self.schedule_auto_speak(reply, language);
                        ReplyKind::Model
                    }
                    Err(err) => {
                        warn!(status = ?err.status, detail = %err.detail, "completion failed");
                        self.append(Message::assistant(i18n::fallback_for(language), language));
                        ReplyKind::Unavailable
                    }
                }
            }
        };

        self.set_typing(false);
        Ok(kind)
    }

    pub fn request_human_handoff(&mut self) -> &Message {
        info!(language = %self.language, "human hand-off requested");
        let notice = i18n::human_handoff_notice(self.language);
        self.append(Message::assistant(notice, self.language))
    }

    fn schedule_auto_speak(&self, text: String, language: Language) {
        if !self.auto_speak {
            return;
        }
        let Some(playback) = self.playback.clone() else {
            return;
        };
        let delay = self.timings.auto_speak_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            playback.play(&text, language);
        });
    }

    fn append(&mut self, message: Message) -> &Message {
        let _ = self
            .events
            .send(ConversationEvent::MessageAppended(message.clone()));
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    fn set_typing(&self, typing: bool) {
        let _ = self.events.send(ConversationEvent::TypingChanged(typing));
    }
}
