//! Agent that runs entirely against local detections plus an optional VLM

use crate::agent::{
    AgentResponse, ConversationHistory, ConversationTurn, CvSummary, NavigationAgent,
};
use crate::mock::MockResponder;
use crate::tools::{CvPayload, NavigationTools};
use crate::vlm::GeminiVlmTool;
use async_trait::async_trait;
use chrono::Utc;
use image::RgbImage;
use tracing::{debug, info, warn};
use wayfinder_core::Settings;

/// Queries containing any of these want a semantic description.
const VLM_KEYWORDS: &[&str] = &[
    "describe",
    "what",
    "where",
    "how many",
    "tell me about",
    "explain",
    "identify",
    "recognize",
    "scene",
    "environment",
    "see",
    "look",
    "show",
    "detail",
    "color",
    "appearance",
];

pub fn needs_vlm(query: &str) -> bool {
    let query = query.to_lowercase();
    VLM_KEYWORDS.iter().any(|k| query.contains(k))
}

pub struct LocalNavigationAgent {
    vlm: GeminiVlmTool,
    tools: NavigationTools,
    history: ConversationHistory,
}

impl LocalNavigationAgent {
    pub fn new(vlm: GeminiVlmTool, tools: NavigationTools) -> Self {
        info!("Local navigation agent ready (VLM available: {})", vlm.is_available());
        Self {
            vlm,
            tools,
            history: ConversationHistory::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            GeminiVlmTool::from_settings(settings),
            NavigationTools::new(settings.google_maps_api_key.as_deref()),
        )
    }

    pub fn tools(&self) -> &NavigationTools {
        &self.tools
    }

    pub fn vlm_available(&self) -> bool {
        self.vlm.is_available()
    }
}

#[async_trait]
impl NavigationAgent for LocalNavigationAgent {
    async fn process_query(
        &self,
        query: &str,
        frame: Option<&RgbImage>,
        cv: &CvPayload,
    ) -> AgentResponse {
        let report = match self.tools.perceive(cv) {
            Ok(report) => report,
            Err(e) => {
                warn!("Error in agent processing: {}", e);
                return AgentResponse::failure(e);
            }
        };

        let haptic_feedback = NavigationTools::haptic_for_report(&report);
        let memory = self.tools.object_memory(&report.objects);
        debug!("Object memory: {} classes seen", memory.distinct_classes);

        let used_vlm = needs_vlm(query) && self.vlm.is_available();
        let text_response = if used_vlm {
            self.vlm.generate_description(frame, &report, query).await
        } else {
            MockResponder::describe(&report, query)
        };

        self.history.push(ConversationTurn {
            timestamp: Utc::now(),
            query: query.to_string(),
            response: text_response.clone(),
            safety_status: report.safety_status.as_str().to_string(),
            num_objects: report.num_objects,
            used_vlm,
            used_bedrock: false,
        });

        AgentResponse {
            text_response,
            haptic_feedback,
            safety_status: report.safety_status.as_str().to_string(),
            cv_summary: Some(CvSummary::from_report(&report, true)),
            used_vlm,
            used_bedrock: false,
            error: None,
        }
    }

    fn history(&self) -> Vec<ConversationTurn> {
        self.history.snapshot()
    }

    fn clear_history(&self) {
        self.history.clear();
        info!("Conversation history cleared");
    }

    fn agent_type(&self) -> &'static str {
        "LocalNavigationAgent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::HapticPattern;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use wayfinder_llm::{Result as LlmResult, VisionModel};

    struct FixedModel;

    #[async_trait]
    impl VisionModel for FixedModel {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn describe(&self, _image: Option<&RgbImage>, _prompt: &str) -> LlmResult<String> {
            Ok("A person stands close in front of you.".to_string())
        }
    }

    fn payload() -> CvPayload {
        serde_json::from_value(json!({
            "timestamp": 1.0,
            "num_objects": 2,
            "objects": [
                {"class": "person", "distance_m": 0.4, "position": "center"},
                {"class": "chair", "distance_m": 2.2, "position": "left"}
            ]
        }))
        .unwrap()
    }

    fn agent(with_vlm: bool) -> LocalNavigationAgent {
        let model: Option<Arc<dyn VisionModel>> = with_vlm.then(|| Arc::new(FixedModel) as _);
        LocalNavigationAgent::new(GeminiVlmTool::new(model), NavigationTools::default())
    }

    #[test]
    fn test_needs_vlm_keywords() {
        assert!(needs_vlm("What's in front of me?"));
        assert!(needs_vlm("How many chairs"));
        assert!(!needs_vlm("Is it safe to walk?"));
    }

    #[tokio::test]
    async fn test_rule_based_answer_and_haptics() {
        let agent = agent(false);
        let response = agent.process_query("Is it safe?", None, &payload()).await;
        assert!(response.text_response.starts_with("Caution! There is a person only 0.4 meters away"));
        assert_eq!(response.haptic_feedback.pattern, Some(HapticPattern::RapidPulse));
        assert_eq!(response.safety_status, "DANGER - Immediate obstacles detected");
        assert!(!response.used_vlm);
        let summary = response.cv_summary.unwrap();
        assert_eq!(summary.critical_count, 1);
        assert_eq!(summary.objects_by_position.unwrap().left, vec!["chair"]);
    }

    #[tokio::test]
    async fn test_vlm_used_for_descriptive_queries() {
        let agent = agent(true);
        let response = agent.process_query("Describe the scene", None, &payload()).await;
        assert!(response.used_vlm);
        assert_eq!(response.text_response, "A person stands close in front of you.");

        let quick = agent.process_query("Is it safe?", None, &payload()).await;
        assert!(!quick.used_vlm);
    }

    #[tokio::test]
    async fn test_vlm_keyword_without_model_stays_rule_based() {
        let agent = agent(false);
        let response = agent.process_query("What do you see", None, &payload()).await;
        assert!(!response.used_vlm);
        assert!(response.text_response.starts_with("I can see:"));
    }

    #[tokio::test]
    async fn test_invalid_payload_gives_error_response() {
        let agent = agent(false);
        let response = agent.process_query("hello", None, &CvPayload::default()).await;
        assert_eq!(response.safety_status, "UNKNOWN");
        assert!(response.error.unwrap().contains("timestamp"));
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_capped_and_cleared() {
        let agent = agent(false);
        for i in 0..7 {
            agent.process_query(&format!("query {}", i), None, &payload()).await;
        }
        let history = agent.history();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].query, "query 2");
        agent.clear_history();
        assert!(agent.history().is_empty());
        assert_eq!(agent.agent_type(), "LocalNavigationAgent");
    }
}
