use crate::error::Result;
use async_trait::async_trait;
use image::RgbImage;

/// A multimodal model that answers a prompt about an optional frame.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Provider name
    fn name(&self) -> &'static str;

    async fn describe(&self, image: Option<&RgbImage>, prompt: &str) -> Result<String>;
}

/// A hosted conversational agent addressed by session.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    fn name(&self) -> &'static str;

    async fn invoke_agent(&self, session_id: &str, input_text: &str) -> Result<String>;
}
