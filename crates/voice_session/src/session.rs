use std::sync::Arc;
use std::time::Duration;

use core_types::{
    Language, SpeechCapability, SpeechPlayback, VoiceRuntimeError, VoiceUnsupportedError,
};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::VoiceError;
use crate::level::LevelSource;
use crate::platform::{
    AudioCapture, RecognitionConfig, RecognitionEvent, SpeechRecognizer, SpeechSynthesizer,
    SynthesisEvent, Utterance, VoiceCapabilities,
};
use crate::state::VoiceState;

const TRANSCRIPT_LINGER: Duration = Duration::from_secs(2);
const AUTO_SPEAK_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechParams {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SpeechParams {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    StateChanged { from: VoiceState, to: VoiceState },
    InterimTranscript(String),
    /// A final transcript ready to be sent as a chat message.
    Utterance(String),
    Error(VoiceRuntimeError),
}

#[derive(Debug, Clone, PartialEq)]
enum TimerKind {
    ClearFinalTranscript,
    ClearDisplayedUtterance,
    AutoSpeak(String),
}

#[derive(Debug)]
struct Timer {
    due: Instant,
    kind: TimerKind,
}

struct Platform {
    recognizer: Box<dyn SpeechRecognizer>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    capture: Option<Box<dyn AudioCapture>>,
}

/// Voice interaction surface: one recognizer, one synthesizer, one state field.
pub struct VoiceSession {
    platform: Result<Platform, VoiceUnsupportedError>,
    state: VoiceState,
    open: bool,
    language: Language,
    params: SpeechParams,
    interim_text: String,
    final_text: String,
    displayed_utterance: Option<String>,
    last_spoken: Option<String>,
    error: Option<VoiceRuntimeError>,
    audio_level: f32,
    level: Option<LevelSource>,
    timers: Vec<Timer>,
    active_utterance: Option<u64>,
    next_utterance_id: u64,
    events: broadcast::Sender<VoiceEvent>,
}

impl VoiceSession {
    pub fn new(capabilities: VoiceCapabilities, language: Language) -> Self {
        let platform = match (capabilities.recognizer, capabilities.synthesizer) {
            (Some(recognizer), Some(synthesizer)) => Ok(Platform {
                recognizer,
                synthesizer,
                capture: capabilities.capture,
            }),
            (recognizer, synthesizer) => {
                let mut missing = Vec::new();
                if recognizer.is_none() {
                    missing.push(SpeechCapability::Recognition);
                }
                if synthesizer.is_none() {
                    missing.push(SpeechCapability::Synthesis);
                }
                let err = VoiceUnsupportedError { missing };
                warn!(error = %err, "voice session unavailable");
                Err(err)
            }
        };
        let (events, _) = broadcast::channel(64);
        Self {
            platform,
            state: VoiceState::Idle,
            open: true,
            language,
            params: SpeechParams::default(),
            interim_text: String::new(),
            final_text: String::new(),
            displayed_utterance: None,
            last_spoken: None,
            error: None,
            audio_level: 0.0,
            level: None,
            timers: Vec::new(),
            active_utterance: None,
            next_utterance_id: 1,
            events,
        }
    }

    pub fn with_params(mut self, params: SpeechParams) -> Self {
        self.params = params;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_supported(&self) -> bool {
        self.platform.is_ok()
    }

    pub fn unsupported_reason(&self) -> Option<&VoiceUnsupportedError> {
        self.platform.as_ref().err()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Takes effect on the next recognition or utterance.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn interim_text(&self) -> &str {
        &self.interim_text
    }

    pub fn final_text(&self) -> &str {
        &self.final_text
    }

    pub fn displayed_utterance(&self) -> Option<&str> {
        self.displayed_utterance.as_deref()
    }

    pub fn error(&self) -> Option<&VoiceRuntimeError> {
        self.error.as_ref()
    }

    pub fn audio_level(&self) -> f32 {
        self.audio_level
    }

    pub fn open(&mut self) -> Result<(), VoiceError> {
        self.platform_mut()?;
        if !self.open {
            info!("voice session opened");
            self.open = true;
        }
        Ok(())
    }

    pub fn start_listening(&mut self) -> Result<(), VoiceError> {
        self.platform_mut()?;
        if !self.open {
            return Err(VoiceError::Closed);
        }
        match self.state {
            VoiceState::Initializing | VoiceState::Listening => {
                return Err(VoiceError::AlreadyListening);
            }
            VoiceState::Speaking => self.stop_speaking()?,
            VoiceState::Idle => {}
        }

        self.timers.retain(|timer| {
            !matches!(
                timer.kind,
                TimerKind::AutoSpeak(_) | TimerKind::ClearFinalTranscript
            )
        });
        self.transition(VoiceState::Initializing);
        self.interim_text.clear();
        self.final_text.clear();
        self.error = None;

        let config = RecognitionConfig::single_utterance(self.language.locale_tag());
        let platform = self.platform_mut()?;
        platform.recognizer.configure(config);
        let level = match platform.capture.as_mut().map(|capture| capture.open()) {
            Some(Ok(meter)) => LevelSource::Meter(meter),
            Some(Err(err)) => {
                warn!(error = %err, "audio capture unavailable, using synthetic level");
                LevelSource::synthetic()
            }
            None => LevelSource::synthetic(),
        };
        let started = platform.recognizer.start();
        self.level = Some(level);

        if let Err(err) = started {
            warn!(error = %err, "speech recognition failed to start");
            self.fail_listening(err.clone());
            return Err(VoiceError::Runtime(err));
        }
        debug!(locale = self.language.locale_tag(), "speech recognition requested");
        Ok(())
    }

    /// Releases capture now; the platform's `End` or `Error` moves the state to Idle.
    pub fn stop_listening(&mut self) -> Result<(), VoiceError> {
        self.platform_mut()?;
        if !self.state.is_capturing() {
            return Ok(());
        }
        self.release_level();
        self.platform_mut()?.recognizer.stop();
        Ok(())
    }

    pub fn speak(&mut self, text: &str) -> Result<(), VoiceError> {
        self.platform_mut()?;
        if !self.open {
            return Err(VoiceError::Closed);
        }
        self.play_utterance(text)
    }

    fn play_utterance(&mut self, text: &str) -> Result<(), VoiceError> {
        self.platform_mut()?;
        if text.trim().is_empty() {
            return Ok(());
        }
        if self.state.is_capturing() {
            self.platform_mut()?.recognizer.abort();
            self.release_level();
            self.interim_text.clear();
            self.transition(VoiceState::Idle);
        }

        let id = self.next_utterance_id;
        self.next_utterance_id += 1;
        let utterance = Utterance {
            id,
            text: text.to_string(),
            locale: self.language.locale_tag(),
            rate: self.params.rate,
            pitch: self.params.pitch,
            volume: self.params.volume,
        };

        let platform = self.platform_mut()?;
        platform.synthesizer.cancel();
        let spoken = platform.synthesizer.speak(utterance);

        self.timers
            .retain(|timer| timer.kind != TimerKind::ClearDisplayedUtterance);
        self.active_utterance = Some(id);
        self.displayed_utterance = Some(text.to_string());
        self.last_spoken = Some(text.to_string());
        if self.state == VoiceState::Speaking {
            debug!(id, "replacing in-flight utterance");
        } else {
            self.transition(VoiceState::Speaking);
        }

        if let Err(err) = spoken {
            warn!(error = %err, "speech synthesis failed to start");
            self.fail_speaking(err.clone());
            return Err(VoiceError::Runtime(err));
        }
        Ok(())
    }

    pub fn stop_speaking(&mut self) -> Result<(), VoiceError> {
        self.platform_mut()?;
        if self.state != VoiceState::Speaking {
            return Ok(());
        }
        self.platform_mut()?.synthesizer.cancel();
        self.active_utterance = None;
        self.displayed_utterance = None;
        self.transition(VoiceState::Idle);
        Ok(())
    }

    pub fn handle_recognition(&mut self, event: RecognitionEvent) {
        if !self.state.is_capturing() {
            debug!(?event, state = %self.state, "ignoring recognition event");
            return;
        }
        match event {
            RecognitionEvent::Started => {
                self.error = None;
                self.transition(VoiceState::Listening);
            }
            RecognitionEvent::Result {
                result_index,
                results,
            } => {
                let mut interim = String::new();
                let mut final_text = String::new();
                for result in results.iter().skip(result_index) {
                    if result.is_final {
                        final_text.push_str(&result.transcript);
                    } else {
                        interim.push_str(&result.transcript);
                    }
                }
                self.interim_text = interim;
                self.emit(VoiceEvent::InterimTranscript(self.interim_text.clone()));

                if !final_text.is_empty() {
                    info!(chars = final_text.chars().count(), "final transcript received");
                    self.interim_text.clear();
                    self.final_text = final_text.clone();
                    self.schedule(TRANSCRIPT_LINGER, TimerKind::ClearFinalTranscript);
                    self.emit(VoiceEvent::Utterance(final_text));
                }
            }
            RecognitionEvent::Error { code } => {
                let err = VoiceRuntimeError::from_platform_code(&code);
                warn!(error = %err, %code, "speech recognition error");
                self.fail_listening(err);
            }
            RecognitionEvent::End => {
                self.release_level();
                self.transition(VoiceState::Idle);
            }
        }
    }

    pub fn handle_synthesis(&mut self, event: SynthesisEvent) {
        match event {
            SynthesisEvent::Started { id } => {
                debug!(id, "utterance started");
            }
            SynthesisEvent::Ended { id } => {
                if self.active_utterance != Some(id) {
                    debug!(id, "ignoring end of cancelled utterance");
                    return;
                }
                self.active_utterance = None;
                self.transition(VoiceState::Idle);
                self.schedule(TRANSCRIPT_LINGER, TimerKind::ClearDisplayedUtterance);
            }
            SynthesisEvent::Error { id, code } => {
                if self.active_utterance != Some(id) {
                    debug!(id, %code, "ignoring error of cancelled utterance");
                    return;
                }
                warn!(id, %code, "speech synthesis error");
                self.fail_speaking(VoiceRuntimeError::Synthesis(code));
            }
        }
    }

    /// Speaks `text` after a short delay unless it was already spoken or the
    /// user is talking.
    pub fn on_assistant_reply(&mut self, text: &str) {
        if !self.open || !self.is_supported() || self.state.is_capturing() {
            return;
        }
        if text.trim().is_empty() || self.last_spoken.as_deref() == Some(text) {
            return;
        }
        self.timers
            .retain(|timer| !matches!(timer.kind, TimerKind::AutoSpeak(_)));
        self.schedule(AUTO_SPEAK_DELAY, TimerKind::AutoSpeak(text.to_string()));
    }

    /// Per-frame tick: fires due timers and samples the input level.
    pub fn on_frame(&mut self) {
        let now = Instant::now();
        let (due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.timers).into_iter().partition(|timer| timer.due <= now);
        self.timers = pending;

        for timer in due {
            match timer.kind {
                TimerKind::ClearFinalTranscript => self.final_text.clear(),
                TimerKind::ClearDisplayedUtterance => {
                    if self.state != VoiceState::Speaking {
                        self.displayed_utterance = None;
                    }
                }
                TimerKind::AutoSpeak(text) => {
                    if !self.open || self.state.is_capturing() {
                        continue;
                    }
                    if self.last_spoken.as_deref() == Some(text.as_str()) {
                        continue;
                    }
                    if let Err(err) = self.speak(&text) {
                        warn!(error = %err, "auto-speak failed");
                    }
                }
            }
        }

        if let Some(level) = self.level.as_mut() {
            self.audio_level = level.sample();
        }
    }

    /// Tears everything down regardless of state.
    pub fn close(&mut self) {
        if let Ok(platform) = self.platform.as_mut() {
            if self.state.is_capturing() {
                platform.recognizer.abort();
            }
            if self.state == VoiceState::Speaking || self.active_utterance.is_some() {
                platform.synthesizer.cancel();
            }
        }
        self.release_level();
        self.transition(VoiceState::Idle);
        self.interim_text.clear();
        self.final_text.clear();
        self.displayed_utterance = None;
        self.error = None;
        self.timers.clear();
        self.active_utterance = None;
        if self.open {
            info!("voice session closed");
            self.open = false;
        }
    }

    fn platform_mut(&mut self) -> Result<&mut Platform, VoiceError> {
        self.platform
            .as_mut()
            .map_err(|err| VoiceError::Unsupported(err.clone()))
    }

    fn fail_listening(&mut self, err: VoiceRuntimeError) {
        self.release_level();
        self.interim_text.clear();
        self.error = Some(err.clone());
        self.transition(VoiceState::Idle);
        self.emit(VoiceEvent::Error(err));
    }

    fn fail_speaking(&mut self, err: VoiceRuntimeError) {
        self.active_utterance = None;
        self.displayed_utterance = None;
        self.error = Some(err.clone());
        self.transition(VoiceState::Idle);
        self.emit(VoiceEvent::Error(err));
    }

    fn release_level(&mut self) {
        if let Some(level) = self.level.take() {
            level.release();
        }
        self.audio_level = 0.0;
    }

    fn schedule(&mut self, delay: Duration, kind: TimerKind) {
        self.timers.push(Timer {
            due: Instant::now() + delay,
            kind,
        });
    }

    fn transition(&mut self, to: VoiceState) {
        let from = self.state;
        if from == to {
            return;
        }
        if !from.can_transition_to(&to) {
            warn!(%from, %to, "unexpected voice state transition");
        }
        debug!("Voice state: {} -> {}", from, to);
        self.state = to;
        self.emit(VoiceEvent::StateChanged { from, to });
    }

    fn emit(&self, event: VoiceEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cloneable handle shared by the host and the conversation controller.
#[derive(Clone)]
pub struct SharedVoiceSession(Arc<Mutex<VoiceSession>>);

impl SharedVoiceSession {
    pub fn new(session: VoiceSession) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    pub fn lock(&self) -> MutexGuard<'_, VoiceSession> {
        self.0.lock()
    }
}

impl SpeechPlayback for SharedVoiceSession {
    /// Chat-side auto-speak: plays at once, whether or not the voice surface is open.
    fn play(&self, text: &str, language: Language) {
        let mut session = self.0.lock();
        session.set_language(language);
        match session.play_utterance(text) {
            Ok(()) => {}
            Err(VoiceError::Unsupported(err)) => debug!(error = %err, "auto-speak skipped"),
            Err(err) => warn!(error = %err, "auto-speak failed"),
        }
    }
}
