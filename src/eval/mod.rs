pub mod metrics;
pub mod runner;

pub use metrics::*;
pub use runner::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no test image found for case '{0}' (tried .jpeg/.jpg/.png)")]
    MissingImage(String),

    #[error("answer file not found: {}", .0.display())]
    MissingAnswers(PathBuf),

    #[error("answer file {} is not a container record array: {message}", .path.display())]
    AnswerShape { path: PathBuf, message: String },

    #[error("no test cases found under {}", .0.display())]
    NoTestCases(PathBuf),
}
