//! Agent backed by a hosted Bedrock agent, with the local agent as fallback

use crate::agent::{
    AgentResponse, ConversationHistory, ConversationTurn, CvSummary, NavigationAgent,
};
use crate::local::LocalNavigationAgent;
use crate::tools::{CvPayload, NavigationTools};
use async_trait::async_trait;
use chrono::Utc;
use image::RgbImage;
use std::sync::Arc;
use tracing::{info, warn};
use wayfinder_core::{SceneReport, Settings};
use wayfinder_llm::{AgentRuntime, BedrockAgentClient, BedrockConfig};

/// Objects listed in the agent input, closest first.
const CONTEXT_OBJECTS: usize = 5;

pub struct BedrockNavigationAgent {
    runtime: Option<Arc<dyn AgentRuntime>>,
    session_id: String,
    local: LocalNavigationAgent,
    history: ConversationHistory,
}

impl BedrockNavigationAgent {
    pub fn new(
        runtime: Option<Arc<dyn AgentRuntime>>,
        session_id: impl Into<String>,
        local: LocalNavigationAgent,
    ) -> Self {
        Self {
            runtime,
            session_id: session_id.into(),
            local,
            history: ConversationHistory::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let local = LocalNavigationAgent::from_settings(settings);
        let runtime: Option<Arc<dyn AgentRuntime>> = if settings.use_bedrock {
            match BedrockConfig::from_settings(settings).map(BedrockAgentClient::new) {
                Some(client) => {
                    info!("Bedrock agent initialized in {}", settings.aws_region);
                    Some(Arc::new(client))
                }
                None => {
                    info!("Bedrock not configured. Using local agent.");
                    None
                }
            }
        } else {
            None
        };
        Self::new(runtime, settings.bedrock_session_id.clone(), local)
    }

    pub fn bedrock_available(&self) -> bool {
        self.runtime.is_some()
    }
}

#[async_trait]
impl NavigationAgent for BedrockNavigationAgent {
    async fn process_query(
        &self,
        query: &str,
        frame: Option<&RgbImage>,
        cv: &CvPayload,
    ) -> AgentResponse {
        let Some(runtime) = &self.runtime else {
            return self.local.process_query(query, frame, cv).await;
        };

        let report = match self.local.tools().perceive(cv) {
            Ok(report) => report,
            Err(e) => {
                warn!("Error in agent processing: {}", e);
                return AgentResponse::failure(e);
            }
        };

        let input = format!(
            "User Query: {}\n\nCurrent Environment:\n{}\n\n\
             Provide a helpful, safety-focused response for navigation assistance.",
            query,
            format_cv_context(&report)
        );

        let text_response = match runtime.invoke_agent(&self.session_id, &input).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Error invoking Bedrock agent: {}. Falling back to local agent.", e);
                return self.local.process_query(query, frame, cv).await;
            }
        };

        self.history.push(ConversationTurn {
            timestamp: Utc::now(),
            query: query.to_string(),
            response: text_response.clone(),
            safety_status: report.safety_status.as_str().to_string(),
            num_objects: report.num_objects,
            used_vlm: false,
            used_bedrock: true,
        });

        AgentResponse {
            text_response,
            haptic_feedback: NavigationTools::haptic_for_report(&report),
            safety_status: report.safety_status.as_str().to_string(),
            cv_summary: Some(CvSummary::from_report(&report, false)),
            used_vlm: false,
            used_bedrock: true,
            error: None,
        }
    }

    fn history(&self) -> Vec<ConversationTurn> {
        if self.bedrock_available() {
            self.history.snapshot()
        } else {
            self.local.history()
        }
    }

    fn clear_history(&self) {
        self.history.clear();
        self.local.clear_history();
    }

    fn agent_type(&self) -> &'static str {
        "BedrockNavigationAgent"
    }
}

/// Scene summary sent as part of the Bedrock agent input.
pub fn format_cv_context(report: &SceneReport) -> String {
    if report.num_objects == 0 {
        return format!("No objects detected. Safety Status: {}", report.safety_status);
    }

    let mut lines = vec![format!(
        "Detected {} object(s). Safety Status: {}\n",
        report.num_objects, report.safety_status
    )];
    for obj in report.objects.iter().take(CONTEXT_OBJECTS) {
        let distance = obj
            .distance_m
            .map(|d| format!("{:.1}m", d))
            .unwrap_or_else(|| "unknown".to_string());
        lines.push(format!("  - {} at {}, {}", obj.class_name, distance, obj.position));
    }

    if !report.critical_alerts.is_empty() {
        lines.push("\nCRITICAL ALERTS:".to_string());
        for alert in &report.critical_alerts {
            if let Some(d) = alert.distance_m {
                lines.push(format!("  ⚠ {} only {:.1}m away!", alert.class_name, d));
            }
        }
    }
    lines.join("\n")
}
