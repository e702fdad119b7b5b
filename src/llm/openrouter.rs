//! OpenRouter HTTP client for vision-capable chat models.
//!
//! Blocking client: each extraction session is strictly sequential, so the
//! orchestrator waits on every model call before re-validating. Parallelism
//! lives one level up, in the evaluation runner, where sessions are
//! independent.

use std::sync::Mutex;

use super::types::{ChatMessage, ChatRequest, ChatResponse};
use super::LlmError;
use crate::config::{MAX_TOKENS, TEMPERATURE};

/// Chat client abstraction (allows mocking the model in tests).
pub trait ChatClient: Send + Sync {
    /// Send the full message history and return the model's reply text.
    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

/// OpenRouter client speaking the OpenAI chat-completions protocol.
pub struct OpenRouterClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenRouterClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        }
    }

    /// Client for the public OpenRouter endpoint with the default timeout.
    pub fn openrouter(api_key: &str) -> Self {
        Self::new(
            crate::config::OPENROUTER_BASE_URL,
            api_key,
            crate::config::REQUEST_TIMEOUT_SECS,
        )
    }
}

impl ChatClient for OpenRouterClient {
    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model,
            messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

/// Mock chat client for testing — replays a scripted sequence of responses.
///
/// The final response repeats once the script is exhausted, which models a
/// collaborator that keeps returning the same (possibly still-invalid)
/// answer. Call counts and per-call history lengths are recorded so tests
/// can assert the conversation grows by one exchange per round.
pub struct MockChatClient {
    responses: Vec<String>,
    cursor: Mutex<usize>,
    history_lens: Mutex<Vec<usize>>,
}

impl MockChatClient {
    pub fn new(response: &str) -> Self {
        Self::with_responses(vec![response.to_string()])
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        assert!(!responses.is_empty(), "mock needs at least one response");
        Self {
            responses,
            cursor: Mutex::new(0),
            history_lens: Mutex::new(Vec::new()),
        }
    }

    /// Number of chat calls made so far.
    pub fn calls(&self) -> usize {
        self.history_lens.lock().unwrap().len()
    }

    /// Message-count of the history sent with each call, in order.
    pub fn history_lens(&self) -> Vec<usize> {
        self.history_lens.lock().unwrap().clone()
    }
}

impl ChatClient for MockChatClient {
    fn chat(&self, _model: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.history_lens.lock().unwrap().push(messages.len());
        let mut cursor = self.cursor.lock().unwrap();
        let response = self.responses[(*cursor).min(self.responses.len() - 1)].clone();
        *cursor += 1;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_replays_scripted_responses() {
        let client = MockChatClient::with_responses(vec!["first".into(), "second".into()]);
        let msgs = [ChatMessage::user_text("hi")];
        assert_eq!(client.chat("m", &msgs).unwrap(), "first");
        assert_eq!(client.chat("m", &msgs).unwrap(), "second");
        // Script exhausted — last response repeats
        assert_eq!(client.chat("m", &msgs).unwrap(), "second");
        assert_eq!(client.calls(), 3);
    }

    #[test]
    fn mock_records_history_lengths() {
        let client = MockChatClient::new("ok");
        let one = [ChatMessage::user_text("a")];
        let three = [
            ChatMessage::user_text("a"),
            ChatMessage::assistant("b"),
            ChatMessage::user_text("c"),
        ];
        client.chat("m", &one).unwrap();
        client.chat("m", &three).unwrap();
        assert_eq!(client.history_lens(), vec![1, 3]);
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = OpenRouterClient::new("https://openrouter.ai/api/v1/", "key", 60);
        assert_eq!(client.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(client.timeout_secs, 60);
    }

    #[test]
    fn openrouter_constructor_uses_default_endpoint() {
        let client = OpenRouterClient::openrouter("key");
        assert_eq!(client.base_url, crate::config::OPENROUTER_BASE_URL);
    }
}
