pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod session;
pub mod types;
pub mod validator;

pub use orchestrator::*;
pub use parser::*;
pub use session::*;
pub use types::*;
pub use validator::*;

use thiserror::Error;

use crate::image::ImageError;
use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] ImageError),

    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("collaborator response is not a container record array: {0}")]
    ResponseShape(String),

    #[error("no parseable container list after {0} extraction rounds")]
    InitialExtractionFailed(u32),
}
