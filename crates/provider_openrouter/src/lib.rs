use std::sync::Arc;

use async_trait::async_trait;
use config::CompletionSettings;
use core_types::{
    AiConfig, BackendFactory, ChatTurn, CompletionBackend, CompletionError, ConfigurationError,
    Language,
};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod prompt;

pub const PROBE_MESSAGE: &str = "Hello, this is a test message.";
const PROBE_MAX_TOKENS: u32 = 10;

/// Chat-completions client for an OpenRouter-compatible endpoint.
pub struct CompletionClient {
    http: reqwest::Client,
    settings: CompletionSettings,
    headers: HeaderMap,
    grounding: RwLock<String>,
}

impl CompletionClient {
    pub fn new(settings: CompletionSettings, credential: &str) -> Result<Self, ConfigurationError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(ConfigurationError::MissingCredential);
        }
        let base_url = settings.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigurationError::InvalidEndpoint(base_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        insert_header(
            &mut headers,
            reqwest::header::AUTHORIZATION,
            &format!("Bearer {credential}"),
        )?;
        insert_header(
            &mut headers,
            HeaderName::from_static("http-referer"),
            &settings.referer,
        )?;
        insert_header(
            &mut headers,
            HeaderName::from_static("x-title"),
            &settings.title,
        )?;

        Ok(Self {
            http: reqwest::Client::new(),
            settings,
            headers,
            grounding: RwLock::new(String::new()),
        })
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    pub fn grounding_text(&self) -> String {
        self.grounding.read().clone()
    }

    /// Sends the connection-test request. Only the status is checked.
    pub async fn probe(&self) -> Result<(), CompletionError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![WireMessage {
                role: "user",
                content: PROBE_MESSAGE,
            }],
            temperature: self.settings.temperature,
            max_tokens: PROBE_MAX_TOKENS,
        };
        self.post(&body).await.map(|_| ())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim().trim_end_matches('/')
        )
    }

    async fn post(&self, body: &ChatRequest<'_>) -> Result<(u16, String), CompletionError> {
        let response = self
            .http
            .post(self.endpoint())
            .headers(self.headers.clone())
            .timeout(self.settings.timeout())
            .json(body)
            .send()
            .await
            .map_err(|err| CompletionError::transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| CompletionError::http(status.as_u16(), err.to_string()))?;
        if !status.is_success() {
            return Err(CompletionError::http(status.as_u16(), text));
        }
        Ok((status.as_u16(), text))
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    fn set_grounding_text(&self, text: String) {
        *self.grounding.write() = text;
    }

    async fn respond(
        &self,
        user_text: &str,
        language: Language,
        history: &[ChatTurn],
    ) -> Result<String, CompletionError> {
        let grounding = self.grounding_text();
        let turns = prompt::build_messages(language, &grounding, history, user_text);
        let body = ChatRequest {
            model: &self.settings.model,
            messages: turns
                .iter()
                .map(|turn| WireMessage {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        debug!(
            model = %self.settings.model,
            %language,
            turns = body.messages.len(),
            "requesting chat completion"
        );

        let (status, text) = self.post(&body).await?;
        let output: ChatResponse = serde_json::from_str(&text)
            .map_err(|err| CompletionError::http(status, format!("invalid response json: {err}")))?;

        let Some(choice) = output.choices.into_iter().next() else {
            return Err(CompletionError::http(status, "no response from model"));
        };
        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            warn!(model = %self.settings.model, "empty completion content");
            return Err(CompletionError::http(status, "empty completion content"));
        }
        Ok(content)
    }
}

/// Builds [`CompletionClient`]s for the conversation controller.
#[derive(Debug, Clone, Default)]
pub struct OpenRouterFactory {
    settings: CompletionSettings,
}

impl OpenRouterFactory {
    pub fn new(settings: CompletionSettings) -> Self {
        Self { settings }
    }
}

impl BackendFactory for OpenRouterFactory {
    fn build(&self, config: &AiConfig) -> Result<Arc<dyn CompletionBackend>, ConfigurationError> {
        if !config.is_usable() {
            return Err(ConfigurationError::MissingCredential);
        }
        let client = CompletionClient::new(self.settings.clone(), &config.credential)?;
        Ok(Arc::new(client))
    }
}

fn insert_header(
    headers: &mut HeaderMap,
    name: HeaderName,
    value: &str,
) -> Result<(), ConfigurationError> {
    let value = HeaderValue::from_str(value.trim()).map_err(|_| ConfigurationError::InvalidHeader {
        name: name.to_string(),
    })?;
    headers.insert(name, value);
    Ok(())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
