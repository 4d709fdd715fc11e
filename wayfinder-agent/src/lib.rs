//! Navigation agents: turn a scene report and a spoken or typed question
//! into a short answer plus haptic cues.

pub mod agent;
pub mod bedrock;
pub mod error;
pub mod factory;
pub mod local;
pub mod mock;
pub mod tools;
pub mod vlm;

pub use agent::{
    AgentResponse, ConversationTurn, CvSummary, NavigationAgent, ObjectsByPosition, HISTORY_LIMIT,
};
pub use bedrock::BedrockNavigationAgent;
pub use error::{AgentError, Result};
pub use factory::AgentFactory;
pub use local::LocalNavigationAgent;
pub use mock::MockResponder;
pub use tools::{CvPayload, HapticFeedback, HapticPattern, NavigationTools, PayloadObject};
pub use vlm::GeminiVlmTool;
