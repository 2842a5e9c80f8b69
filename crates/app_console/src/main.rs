use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{AppConfig, ConfigStore};
use core_orchestrator::{ConversationController, VoiceBridge};
use core_types::{Message, Sender, UserContext};
use i18n::I18n;
use knowledge::{DEFAULT_CORPUS, HttpDocumentSource, KnowledgeCache};
use provider_openrouter::{CompletionClient, OpenRouterFactory};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use voice_session::{SharedVoiceSession, SpeechParams, VoiceCapabilities, VoiceSession};

mod commands;

use commands::Command;

const FRAME_INTERVAL: Duration = Duration::from_millis(50);

struct Console {
    store: ConfigStore,
    config: AppConfig,
    controller: ConversationController,
    voice: SharedVoiceSession,
    i18n: I18n,
    printed: usize,
}

fn main() {
    let mut data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    data_dir.push("campus-assistant");
    if let Err(err) = fs::create_dir_all(&data_dir) {
        eprintln!("failed to prepare data dir: {err}");
    }
    let _log_guard = init_local_logger(&data_dir.join("logs"));

    let store = ConfigStore::from_default_location()
        .unwrap_or_else(|_| ConfigStore::from_dir(data_dir.join("config")));
    let config = match store.load_or_init() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config: {err:#}");
            AppConfig::default()
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to create tokio runtime: {err}");
            return;
        }
    };

    if let Err(err) = runtime.block_on(run(store, config)) {
        error!("console exited with error: {err:#}");
        eprintln!("error: {err:#}");
    }
}

async fn run(store: ConfigStore, config: AppConfig) -> Result<()> {
    let source = HttpDocumentSource::new(config.knowledge.fetch_timeout())
        .context("failed to build knowledge http client")?;
    let knowledge = Arc::new(KnowledgeCache::with_settings(
        Arc::new(source),
        config.knowledge.ttl(),
        DEFAULT_CORPUS,
    ));
    let factory = Arc::new(OpenRouterFactory::new(config.completion.clone()));

    let user = UserContext::new(std::env::var("CAMPUS_ASSISTANT_USER").unwrap_or_default());
    let mut controller =
        ConversationController::new(user, config.ai.clone(), factory, knowledge);
    controller.set_language(config.language);
    controller.set_auto_speak(config.voice.auto_speak);

    let params = SpeechParams {
        rate: config.voice.rate,
        pitch: config.voice.pitch,
        volume: config.voice.volume,
    };
    let voice = SharedVoiceSession::new(
        VoiceSession::new(VoiceCapabilities::none(), config.language).with_params(params),
    );
    controller.attach_playback(Arc::new(voice.clone()));

    info!(
        language = %config.language,
        configured = controller.is_configured(),
        config = %store.path().display(),
        "campus assistant console started"
    );

    let mut console = Console {
        i18n: I18n::new(config.language),
        store,
        config,
        controller,
        voice,
        printed: 0,
    };
    let mut bridge = VoiceBridge::new(&console.controller, console.voice.clone());
    console.print_new_messages();
    console.print_voice_status();
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if !console.handle(commands::parse(&line)).await {
                    break;
                }
            }
            Some(text) = bridge.next_utterance() => {
                if let Err(err) = bridge.send_utterance(&mut console.controller, &text).await {
                    println!("{err}");
                }
                console.print_new_messages();
            }
            _ = frames.tick() => {
                bridge.forward_replies();
                console.voice.lock().on_frame();
            }
        }
    }

    console.voice.lock().close();
    info!("campus assistant console stopped");
    Ok(())
}

impl Console {
    /// Returns `false` when the console should exit.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Empty => {}
            Command::Quit => return false,
            Command::Help => println!("{}", commands::HELP),
            Command::Invalid(reason) => println!("{reason}"),
            Command::Send(text) => {
                println!("{}", self.i18n.t("chat.typing"));
                if let Err(err) = self.controller.send(&text).await {
                    println!("{err}");
                }
                self.print_new_messages();
            }
            Command::SetLanguage(language) => {
                self.controller.set_language(language);
                self.voice.lock().set_language(language);
                self.i18n.set_language(language);
                self.config.language = language;
                self.persist();
                println!(
                    "{}: {}",
                    self.i18n.t("chat.language_changed"),
                    language.display_name()
                );
            }
            Command::Configure {
                credential,
                knowledge_source_ref,
            } => self.configure(&credential, knowledge_source_ref),
            Command::TestConnection => self.test_connection().await,
            Command::AutoSpeak(enabled) => {
                self.controller.set_auto_speak(enabled);
                self.config.voice.auto_speak = enabled;
                self.persist();
                let key = if enabled {
                    "voice.auto_speak_on"
                } else {
                    "voice.auto_speak_off"
                };
                println!("{}", self.i18n.t(key));
            }
            Command::Handoff => {
                self.controller.request_human_handoff();
                self.print_new_messages();
            }
            Command::Samples => {
                println!("{}:", self.i18n.t("chat.quick_queries"));
                for query in self.controller.sample_queries() {
                    println!("  - {query}");
                }
            }
            Command::Voice => self.print_voice_status(),
        }
        true
    }

    fn configure(&mut self, credential: &str, knowledge_source_ref: Option<String>) {
        let ai = match self
            .store
            .save_ai_config(&mut self.config, credential, knowledge_source_ref)
        {
            Ok(ai) => ai,
            Err(err) => {
                warn!("AI configuration rejected: {err:#}");
                println!("{}", self.i18n.t("config.missing_credential"));
                return;
            }
        };
        match self.controller.apply_ai_config(ai) {
            Ok(()) => println!("{}", self.i18n.t("config.saved")),
            Err(err) => println!("{}: {err}", self.i18n.t("config.test_failed")),
        }
    }

    async fn test_connection(&self) {
        let result = match CompletionClient::new(
            self.config.completion.clone(),
            &self.config.ai.credential,
        ) {
            Ok(client) => client.probe().await.map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        match result {
            Ok(()) => println!("{}", self.i18n.t("config.test_ok")),
            Err(err) => {
                warn!(error = %err, "connection test failed");
                println!("{}: {err}", self.i18n.t("config.test_failed"));
            }
        }
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.config) {
            error!("failed to save config: {err:#}");
        }
    }

    fn print_new_messages(&mut self) {
        let messages = self.controller.messages();
        for message in &messages[self.printed..] {
            print_message(message);
        }
        self.printed = messages.len();
    }

    fn print_voice_status(&self) {
        let voice = self.voice.lock();
        match voice.unsupported_reason() {
            Some(reason) => {
                info!(%reason, "voice features disabled");
                println!("{}", self.i18n.t("voice.unsupported"));
            }
            None => println!("voice: {}", voice.state()),
        }
    }
}

fn print_message(message: &Message) {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Assistant => "assistant",
    };
    println!(
        "[{} {who}/{}] {}",
        message.timestamp.format("%H:%M"),
        message.language,
        message.text
    );
}

fn init_local_logger(log_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log dir `{}`: {err}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "campus-assistant.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,app_console=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_writer(writer)
        .init();

    guard
}
