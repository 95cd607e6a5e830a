//! OpenAI-compatible chat completions client.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use jobscout_core::config::LlmConfig;
use jobscout_core::error::{JobscoutError, Result};
use jobscout_core::types::ChatTurn;

/// One message in a completion request, wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

impl From<&ChatTurn> for ChatMessage {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

/// Generation parameters for one completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 400,
        }
    }
}

/// Interface to the remote completion service.
///
/// [`CompletionClient`] is the production implementation; tests use
/// [`crate::mock::MockBackend`].
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate a completion for the given conversation.
    async fn complete(&self, messages: &[ChatMessage], options: CompletionOptions)
        -> Result<String>;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// reqwest-backed completion client with API-key rotation.
///
/// Keys are tried in order starting from the currently active one; a
/// rate-limited response advances to the next key. When every key is
/// rate limited the call fails with [`JobscoutError::RateLimited`].
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    keys: Vec<String>,
    active_key: AtomicUsize,
}

impl CompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let keys: Vec<String> = config
            .api_keys
            .iter()
            .filter(|k| !k.is_empty())
            .cloned()
            .collect();
        if keys.is_empty() {
            return Err(JobscoutError::Config(
                "no completion API keys configured".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                JobscoutError::Completion(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            keys,
            active_key: AtomicUsize::new(0),
        })
    }

    async fn attempt(&self, key: &str, request: &ChatCompletionRequest<'_>) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(key)
            .json(request)
            .send()
            .await
            .map_err(|e| JobscoutError::Completion(format!("request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(JobscoutError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JobscoutError::Completion(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let decoded: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| JobscoutError::Decode(format!("completion response: {}", e)))?;

        let content = decoded
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(JobscoutError::Completion(
                "model returned empty content".to_string(),
            ));
        }
        Ok(content)
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        // One attempt per configured key; rate limits rotate forward so
        // the next call starts from the key that last worked.
        for _ in 0..self.keys.len() {
            let index = self.active_key.load(Ordering::Relaxed) % self.keys.len();
            debug!(model = %self.model, key_index = index, "Calling completion service");

            match self.attempt(&self.keys[index], &request).await {
                Err(JobscoutError::RateLimited) => {
                    warn!(key_index = index, "Completion key rate limited, rotating");
                    self.active_key.store(index + 1, Ordering::Relaxed);
                }
                other => return other,
            }
        }
        Err(JobscoutError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_a_key() {
        let config = LlmConfig::default();
        assert!(matches!(
            CompletionClient::new(&config),
            Err(JobscoutError::Config(_))
        ));

        let config = LlmConfig {
            api_keys: vec![String::new(), "gsk_real".to_string()],
            ..LlmConfig::default()
        };
        let client = CompletionClient::new(&config).unwrap();
        assert_eq!(client.keys.len(), 1);
    }

    #[test]
    fn test_chat_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
    }

    #[test]
    fn test_chat_message_from_turn() {
        let msg: ChatMessage = (&ChatTurn::assistant("ответ")).into();
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "ответ");
    }

    #[test]
    fn test_request_serializes_to_openai_shape() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "test-model",
            messages: &messages,
            temperature: 0.5,
            max_tokens: 100,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 100);
    }

    #[test]
    fn test_response_decodes_choices() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "hello"}}],
                       "usage": {"total_tokens": 10}}"#;
        let decoded: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            decoded.choices[0].message.content.as_deref(),
            Some("hello")
        );
    }
}
