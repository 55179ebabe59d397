pub mod ollama;
pub mod sanitize;

pub use ollama::*;
pub use sanitize::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Language model server not reachable at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Language model returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

/// Text generation seam used by the normalization and generation stages.
pub trait LlmClient {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError>;
}
