//! Chat-completion clients.
//!
//! Every provider is reduced to one call: a system prompt plus a message
//! list in, a text reply out. Structured output is requested through
//! [`LlmRequest::json_output`] and decoded with [`complete_json`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use shopwise_core::domain::conversation::{ChatMessage, ChatRole};
use shopwise_core::{AppConfig, LlmProvider};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm provider unavailable: {0}")]
    Unavailable(String),
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm reply did not contain a JSON object")]
    MissingJson,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json_output: bool,
}

impl LlmRequest {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            json_output: false,
        }
    }

    /// A single user turn with no system prompt.
    pub fn prompt(content: impl Into<String>) -> Self {
        Self {
            system: None,
            messages: vec![ChatMessage::user(content)],
            temperature: None,
            max_tokens: None,
            json_output: false,
        }
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError>;
}

/// Runs `request` in JSON mode and decodes the first JSON object in the reply.
pub async fn complete_json<T: DeserializeOwned>(
    client: &dyn LlmClient,
    request: &LlmRequest,
) -> Result<T, LlmError> {
    let mut request = request.clone();
    request.json_output = true;
    let reply = client.complete(&request).await?;
    let object = extract_json_object(&reply).ok_or(LlmError::MissingJson)?;
    serde_json::from_str(object).map_err(|error| LlmError::Decode(error.to_string()))
}

/// Finds the first balanced `{...}` in `text`, skipping markdown fences and
/// braces inside string literals.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Builds the client for the configured provider.
pub fn build_client(config: &AppConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    match config.llm.provider {
        LlmProvider::Offline => Ok(Arc::new(OfflineLlmClient)),
        provider => {
            let base_url = config
                .llm_base_url()
                .ok_or_else(|| LlmError::Unavailable(format!("no base url for {provider:?}")))?;
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.llm.timeout_secs.max(1)))
                .build()
                .map_err(|error| LlmError::Transport(error.to_string()))?;
            Ok(Arc::new(HttpLlmClient {
                http,
                provider,
                base_url: base_url.trim_end_matches('/').to_string(),
                model: config.llm.model.clone(),
                api_key: config.llm.api_key.clone(),
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
            }))
        }
    }
}

pub struct HttpLlmClient {
    http: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    temperature: f32,
    max_tokens: u32,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    fn provider_name(&self) -> &'static str {
        match self.provider {
            LlmProvider::Gemini => "gemini",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Ollama => "ollama",
            LlmProvider::Offline => "offline",
        }
    }

    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        debug!(
            event_name = "agent.llm.request",
            provider = self.provider_name(),
            model = %self.model,
            messages = request.messages.len(),
            json_output = request.json_output,
            "sending completion request"
        );
        match self.provider {
            LlmProvider::Gemini => self.complete_gemini(request).await,
            LlmProvider::OpenAi => self.complete_openai(request).await,
            LlmProvider::Ollama => self.complete_ollama(request).await,
            LlmProvider::Offline => Err(LlmError::Unavailable("offline provider".to_string())),
        }
    }
}

impl HttpLlmClient {
    fn temperature(&self, request: &LlmRequest) -> f32 {
        request.temperature.unwrap_or(self.temperature)
    }

    fn max_tokens(&self, request: &LlmRequest) -> u32 {
        request.max_tokens.unwrap_or(self.max_tokens)
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| LlmError::Unavailable("missing api key".to_string()))
    }

    async fn post(&self, request: reqwest::RequestBuilder, body: &Value) -> Result<Value, LlmError> {
        let response = request
            .json(body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body: truncate(&body, 512) });
        }

        response.json().await.map_err(|error| LlmError::Decode(error.to_string()))
    }

    async fn complete_gemini(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let contents: Vec<Value> = request
            .messages
            .iter()
            .map(|message| {
                let role = match message.role {
                    ChatRole::Assistant => "model",
                    ChatRole::User | ChatRole::Tool | ChatRole::System => "user",
                };
                json!({ "role": role, "parts": [{ "text": flatten_content(message) }] })
            })
            .collect();

        let mut generation_config = json!({
            "temperature": self.temperature(request),
            "maxOutputTokens": self.max_tokens(request),
        });
        if request.json_output {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({ "contents": contents, "generationConfig": generation_config });
        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let builder = self.http.post(url).header("x-goog-api-key", self.api_key()?);
        let payload: GeminiResponse = decode(self.post(builder, &body).await?)?;

        payload
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate.content.parts.into_iter().map(|part| part.text).collect::<String>()
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| LlmError::Decode("gemini returned no candidates".to_string()))
    }

    async fn complete_openai(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let mut body = json!({
            "model": self.model,
            "messages": wire_messages(request),
            "temperature": self.temperature(request),
            "max_tokens": self.max_tokens(request),
        });
        if request.json_output {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let url = format!("{}/v1/chat/completions", self.base_url);
        let builder = self.http.post(url).bearer_auth(self.api_key()?);
        let payload: OpenAiResponse = decode(self.post(builder, &body).await?)?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Decode("openai returned no choices".to_string()))
    }

    async fn complete_ollama(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let mut body = json!({
            "model": self.model,
            "messages": wire_messages(request),
            "stream": false,
            "options": {
                "temperature": self.temperature(request),
                "num_predict": self.max_tokens(request),
            },
        });
        if request.json_output {
            body["format"] = json!("json");
        }

        let url = format!("{}/api/chat", self.base_url);
        let payload: OllamaResponse = decode(self.post(self.http.post(url), &body).await?)?;
        Ok(payload.message.content)
    }
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

/// OpenAI-style role/content pairs. Tool output travels as a user turn since
/// the tool protocol is prompt-based.
fn wire_messages(request: &LlmRequest) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(WireMessage { role: "system", content: system.clone() });
    }
    messages.extend(request.messages.iter().map(|message| WireMessage {
        role: match message.role {
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
            ChatRole::User | ChatRole::Tool => "user",
        },
        content: flatten_content(message),
    }));
    messages
}

fn flatten_content(message: &ChatMessage) -> String {
    match message.role {
        ChatRole::Tool => format!("Tool result:\n{}", message.content),
        _ => message.content.clone(),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, LlmError> {
    serde_json::from_value(value).map_err(|error| LlmError::Decode(error.to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

/// Fails every call, so callers always take their deterministic path.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineLlmClient;

#[async_trait]
impl LlmClient for OfflineLlmClient {
    fn provider_name(&self) -> &'static str {
        "offline"
    }

    async fn complete(&self, _request: &LlmRequest) -> Result<String, LlmError> {
        Err(LlmError::Unavailable("running without a language model".to_string()))
    }
}

/// Replays queued replies in order and records every request it sees. Once
/// the queue is empty it behaves like [`OfflineLlmClient`].
#[derive(Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|reply| Ok(reply.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(reply.into()));
    }

    pub async fn push_error(&self, error: LlmError) {
        self.replies.lock().await.push_back(Err(error));
    }

    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.replies.lock().await.len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        self.requests.lock().await.push(request.clone());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Unavailable("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::{
        build_client, complete_json, extract_json_object, LlmClient, LlmError, LlmRequest,
        OfflineLlmClient, ScriptedLlmClient,
    };
    use shopwise_core::{AppConfig, LlmProvider};

    #[derive(Debug, Deserialize, PartialEq)]
    struct IntentReply {
        intent: String,
    }

    #[test]
    fn json_object_is_found_inside_fences_and_prose() {
        let reply = "Sure!\n```json\n{\"intent\": \"checkout\", \"note\": \"a } brace\"}\n```";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"intent\": \"checkout\", \"note\": \"a } brace\"}")
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{\"unterminated\": "), None);
    }

    #[test]
    fn nested_objects_are_kept_whole() {
        let reply = r#"{"tool": "check_availability", "arguments": {"sku": "FOO1000"}} trailing"#;
        assert_eq!(
            extract_json_object(reply),
            Some(r#"{"tool": "check_availability", "arguments": {"sku": "FOO1000"}}"#)
        );
    }

    #[tokio::test]
    async fn scripted_client_replays_in_order_then_runs_dry() {
        let client = ScriptedLlmClient::new(["first", "{\"intent\": \"greeting\"}"]);
        let request = LlmRequest::prompt("hello");

        assert_eq!(client.complete(&request).await, Ok("first".to_string()));
        let decoded: IntentReply =
            complete_json(&client, &request).await.expect("scripted reply should decode");
        assert_eq!(decoded.intent, "greeting");
        assert!(matches!(client.complete(&request).await, Err(LlmError::Unavailable(_))));

        let seen = client.requests().await;
        assert_eq!(seen.len(), 3);
        assert!(seen[1].json_output);
    }

    #[tokio::test]
    async fn reply_without_json_is_reported() {
        let client = ScriptedLlmClient::new(["I think the intent is checkout"]);
        let result: Result<IntentReply, _> =
            complete_json(&client, &LlmRequest::prompt("pay")).await;
        assert_eq!(result, Err(LlmError::MissingJson));
    }

    #[tokio::test]
    async fn offline_provider_builds_a_failing_client() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Offline;

        let client = build_client(&config).unwrap_or_else(|error| panic!("{error}"));
        assert_eq!(client.provider_name(), "offline");
        assert!(OfflineLlmClient.complete(&LlmRequest::prompt("hi")).await.is_err());
        assert!(client.complete(&LlmRequest::prompt("hi")).await.is_err());
    }
}
