/// Generation Client — the single point of entry for all LLM calls in Parley.
///
/// ARCHITECTURAL RULE: No other module may talk to the model provider directly.
/// The interview engine and the report synthesizer depend only on the
/// `GenerationClient` trait ("submit role-tagged messages, receive text"),
/// never on a provider's request/response shape.
///
/// Model: llama-3.3-70b-versatile via Groq's OpenAI-compatible endpoint.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// The model used for all generation calls in Parley.
/// Intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("generation call exceeded {secs}s deadline")]
    Timeout { secs: u64 },

    #[error("model returned empty content")]
    EmptyContent,
}

/// Role of a chat message. Serialized lowercase to match the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// One generation request: messages in, text out. No retries — a failed call
/// surfaces to the caller, whose state must remain untouched so the same
/// request is safe to resubmit.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The generation boundary. Implemented by `GroqClient` in production and by
/// scripted fakes in tests.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// The production generation client. One bounded synchronous call per request;
/// the deadline is enforced here so callers can treat expiry exactly like any
/// other remote failure.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    timeout_secs: u64,
}

impl GroqClient {
    pub fn new(api_key: String, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            timeout_secs,
        }
    }
}

#[async_trait]
impl GenerationClient for GroqClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model: MODEL,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        let deadline = std::time::Duration::from_secs(self.timeout_secs);
        let send = self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(deadline, send)
            .await
            .map_err(|_| LlmError::Timeout {
                secs: self.timeout_secs,
            })??;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;

        if let Some(usage) = &completion.usage {
            debug!(
                "generation call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}
