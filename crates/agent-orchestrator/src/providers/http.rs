//! Hosted model APIs behind `ExtractionProvider`
//!
//! One client type covers the three wire formats in use: OpenAI-compatible
//! chat completions, Anthropic messages and Gemini `generateContent`. Each
//! asks for a JSON answer and hands the reply text to [`extract_json`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_types::ProviderId;
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::json_parser::extract_json;
use crate::prompts::{build_user_prompt, SYSTEM_PROMPT};
use crate::provider::{ExtractionProvider, ExtractionRequest};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const TEMPERATURE: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Openai,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// One `[[providers]]` entry of the server config
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    4096
}

impl ProviderConfig {
    pub fn new(id: impl Into<String>, kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            model: model.into(),
            api_key_env: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_key_env())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
    }
}

pub struct HttpProvider {
    id: ProviderId,
    config: ProviderConfig,
    client: Client,
}

impl HttpProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            id: ProviderId::new(config.id.clone()),
            config,
            client,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Read at call time so a key can be added without a restart
    fn api_key(&self) -> Result<String, ProviderError> {
        let var = self.config.api_key_env();
        std::env::var(var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey(var.to_string()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ProviderError> {
        let response = request.send().await.map_err(|e| self.request_error(e))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: message,
            });
        }

        response.json().await.map_err(|e| self.request_error(e))
    }

    fn request_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.config.timeout_secs)
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::Http(e.to_string())
        }
    }

    async fn call_openai(&self, key: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {"type": "json_object"},
            "temperature": TEMPERATURE,
            "max_tokens": self.config.max_tokens,
        });

        let url = format!("{}/chat/completions", self.config.base_url());
        let response = self
            .send(self.client.post(url).bearer_auth(key).json(&body))
            .await?;

        text_at(&response, "/choices/0/message/content")
    }

    async fn call_anthropic(&self, key: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [{"role": "user", "content": user_prompt}],
        });

        let url = format!("{}/messages", self.config.base_url());
        let response = self
            .send(
                self.client
                    .post(url)
                    .header("x-api-key", key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body),
            )
            .await?;

        let text = response
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "reply has no text content".into(),
            ));
        }
        Ok(text)
    }

    async fn call_gemini(&self, key: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "systemInstruction": {"parts": [{"text": SYSTEM_PROMPT}]},
            "contents": [{"role": "user", "parts": [{"text": user_prompt}]}],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": self.config.max_tokens,
                "responseMimeType": "application/json",
            },
        });

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url(),
            self.config.model
        );
        let response = self
            .send(
                self.client
                    .post(url)
                    .header("x-goog-api-key", key)
                    .json(&body),
            )
            .await?;

        text_at(&response, "/candidates/0/content/parts/0/text")
    }
}

fn text_at(response: &Value, pointer: &str) -> Result<String, ProviderError> {
    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("missing {}", pointer)))
}

#[async_trait]
impl ExtractionProvider for HttpProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    #[instrument(skip(self, request), fields(provider = %self.id, model = %self.config.model))]
    async fn extract(&self, request: &ExtractionRequest) -> Result<Value, ProviderError> {
        let key = self.api_key()?;
        let user_prompt = build_user_prompt(request);

        let reply = match self.config.kind {
            ProviderKind::Openai => self.call_openai(&key, &user_prompt).await?,
            ProviderKind::Anthropic => self.call_anthropic(&key, &user_prompt).await?,
            ProviderKind::Gemini => self.call_gemini(&key, &user_prompt).await?,
        };
        debug!("Received {} characters", reply.len());

        extract_json(&reply)
    }
}
