use thiserror::Error;
use wayfinder_llm::LLMError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Perception error: {0}")]
    Perception(String),

    #[error("Model error: {0}")]
    Llm(#[from] LLMError),

    #[error("Agent not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
