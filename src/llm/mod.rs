pub mod openrouter;
pub mod types;

pub use openrouter::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("cannot reach OpenRouter at {0}")]
    Connection(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("OpenRouter returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("response contained no message content")]
    EmptyResponse,

    #[error("response parsing error: {0}")]
    ResponseParsing(String),
}

impl LlmError {
    /// Transport-level failures (network, timeout, auth, server errors)
    /// terminate a correction session. Malformed-content failures do not;
    /// they burn a round and the session carries on.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LlmError::Connection(_)
                | LlmError::Timeout(_)
                | LlmError::HttpClient(_)
                | LlmError::Api { .. }
        )
    }
}
