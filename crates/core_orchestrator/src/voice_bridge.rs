use core_types::Sender;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, warn};
use voice_session::{SharedVoiceSession, VoiceEvent};

use crate::{ConversationController, ConversationEvent, ReplyKind, SendError};

/// Connects the voice surface to a conversation: recognized utterances go to
/// the send path, assistant replies go to the surface's own auto-speak.
pub struct VoiceBridge {
    voice: SharedVoiceSession,
    voice_events: broadcast::Receiver<VoiceEvent>,
    conversation_events: broadcast::Receiver<ConversationEvent>,
}

impl VoiceBridge {
    pub fn new(controller: &ConversationController, voice: SharedVoiceSession) -> Self {
        let voice_events = voice.lock().subscribe();
        Self {
            voice,
            voice_events,
            conversation_events: controller.subscribe(),
        }
    }

    /// Waits for the next final transcript. `None` once the session is gone.
    pub async fn next_utterance(&mut self) -> Option<String> {
        loop {
            match self.voice_events.recv().await {
                Ok(VoiceEvent::Utterance(text)) => return Some(text),
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => {
                    warn!("voice event receiver lagged, missed {} events", n);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub async fn send_utterance(
        &mut self,
        controller: &mut ConversationController,
        text: &str,
    ) -> Result<ReplyKind, SendError> {
        debug!(chars = text.chars().count(), "sending recognized utterance");
        let kind = controller.send(text).await;
        self.forward_replies();
        kind
    }

    /// Hands every assistant message appended since the last call to the
    /// voice surface, independent of the chat's auto-speak toggle.
    pub fn forward_replies(&mut self) {
        loop {
            match self.conversation_events.try_recv() {
                Ok(ConversationEvent::MessageAppended(message))
                    if message.sender == Sender::Assistant =>
                {
                    let mut voice = self.voice.lock();
                    voice.set_language(message.language);
                    voice.on_assistant_reply(&message.text);
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(n)) => {
                    warn!("conversation event receiver lagged, missed {} events", n);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}
