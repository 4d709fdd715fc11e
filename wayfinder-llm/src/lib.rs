//! Hosted model clients: Gemini for scene descriptions and the Bedrock
//! Agent Runtime for conversational navigation help.

pub mod bedrock;
pub mod error;
pub mod gemini;
pub mod provider;

pub use bedrock::{BedrockAgentClient, BedrockConfig};
pub use error::{LLMError, Result};
pub use gemini::GeminiClient;
pub use provider::{AgentRuntime, VisionModel};
