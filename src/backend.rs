//! Embedding and generation backend.
//!
//! The pipelines consume the backend through [`TextBackend`]:
//! order-preserving batched embedding, and chat-style text generation used
//! only by the HyDE query expansion. [`OllamaBackend`] implements both
//! against a local Ollama instance.
//!
//! # Retry Strategy
//!
//! Transport-level retries with exponential backoff (1s, 2s, 4s, ... capped
//! at 32s) on HTTP 429, 5xx, and network errors; other 4xx responses fail
//! immediately. The pipelines themselves never retry.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::StoreError;

/// One chat-style prompt message.
#[derive(Debug, Clone, Serialize)]
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

#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Embed a batch of texts, returning one fixed-length vector per input
    /// in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError>;

    /// Generate a completion for a chat-style prompt.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, StoreError>;
}

/// Backend implementation calling the Ollama HTTP API.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    embed_model: String,
    generate_model: String,
    max_retries: u32,
    generate_temperature: f32,
    generate_max_tokens: u32,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OllamaBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            embed_model: config.embed_model.clone(),
            generate_model: config.generate_model.clone(),
            max_retries: config.max_retries,
            generate_temperature: config.generate_temperature,
            generate_max_tokens: config.generate_max_tokens,
        })
    }

    /// POST `body` to `path`, retrying 429/5xx/network failures with
    /// exponential backoff.
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, StoreError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err: Option<StoreError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self.client.post(&url).json(body).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json()
                            .await
                            .map_err(|e| StoreError::Backend(e.to_string()));
                    }

                    let body_text = response.text().await.unwrap_or_default();

                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err =
                            Some(StoreError::Backend(format!("{path} {status}: {body_text}")));
                        continue;
                    }

                    return Err(StoreError::Backend(format!(
                        "{path} {status}: {body_text}"
                    )));
                }
                Err(err) => {
                    last_err = Some(classify_transport_error(path, err));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| StoreError::Backend(format!("{path} failed after retries"))))
    }
}

fn classify_transport_error(path: &str, err: reqwest::Error) -> StoreError {
    if err.is_connect() || err.is_timeout() {
        StoreError::BackendUnavailable(format!("{path}: {err}"))
    } else {
        StoreError::Backend(format!("{path}: {err}"))
    }
}

#[async_trait]
impl TextBackend for OllamaBackend {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        let body = serde_json::json!({
            "model": self.embed_model,
            "input": texts,
        });

        let json = self.post_json("/api/embed", &body).await?;
        let parsed: EmbedResponse =
            serde_json::from_value(json).map_err(|e| StoreError::Backend(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(StoreError::Backend(format!(
                "embedding count mismatch: sent {} texts, got {} vectors",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        Ok(parsed.embeddings)
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, StoreError> {
        let body = serde_json::json!({
            "model": self.generate_model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.generate_temperature,
                "num_predict": self.generate_max_tokens,
            },
        });

        let json = self.post_json("/api/chat", &body).await?;
        let parsed: ChatResponse =
            serde_json::from_value(json).map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(parsed.message.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embed_response() {
        let json = serde_json::json!({
            "model": "nomic-embed-text",
            "embeddings": [[0.1, 0.2], [0.3, 0.4]],
        });
        let parsed: EmbedResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1], vec![0.3, 0.4]);
    }

    #[test]
    fn test_parse_chat_response() {
        let json = serde_json::json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "  The sky is blue.  "},
            "done": true,
        });
        let parsed: ChatResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.message.content.trim(), "The sky is blue.");
    }

    #[test]
    fn test_chat_message_roles() {
        let msg = ChatMessage::system("rules");
        assert_eq!(msg.role, "system");
        let msg = ChatMessage::user("question");
        assert_eq!(msg.role, "user");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = BackendConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..BackendConfig::default()
        };
        let backend = OllamaBackend::new(&config).unwrap();
        assert_eq!(backend.base_url, "http://localhost:11434");
    }
}
