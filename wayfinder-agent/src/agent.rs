//! Navigation agent interface and response types

use crate::tools::{CvPayload, HapticFeedback};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::RgbImage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use wayfinder_core::{Position, SceneReport};

/// Exchanges kept per agent.
pub const HISTORY_LIMIT: usize = 5;

/// Status reported when the scene could not be assessed.
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectsByPosition {
    pub left: Vec<String>,
    pub center: Vec<String>,
    pub right: Vec<String>,
}

impl ObjectsByPosition {
    pub fn from_report(report: &SceneReport) -> Self {
        let names = |p: Position| -> Vec<String> {
            report.classes_at(p).into_iter().map(str::to_string).collect()
        };
        Self {
            left: names(Position::Left),
            center: names(Position::Center),
            right: names(Position::Right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvSummary {
    pub total_objects: usize,
    pub critical_count: usize,
    pub safety_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects_by_position: Option<ObjectsByPosition>,
}

impl CvSummary {
    pub fn from_report(report: &SceneReport, with_positions: bool) -> Self {
        Self {
            total_objects: report.num_objects,
            critical_count: report.critical_alerts.len(),
            safety_status: report.safety_status.as_str().to_string(),
            objects_by_position: with_positions.then(|| ObjectsByPosition::from_report(report)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub text_response: String,
    pub haptic_feedback: HapticFeedback,
    pub safety_status: String,
    pub cv_summary: Option<CvSummary>,
    #[serde(default)]
    pub used_vlm: bool,
    #[serde(default)]
    pub used_bedrock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    /// Reply for a query that could not be processed.
    pub fn failure(error: impl ToString) -> Self {
        Self {
            text_response: "I encountered an error processing your request. Please try again."
                .to_string(),
            haptic_feedback: HapticFeedback::disabled(),
            safety_status: UNKNOWN_STATUS.to_string(),
            cv_summary: None,
            used_vlm: false,
            used_bedrock: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: String,
    pub safety_status: String,
    pub num_objects: usize,
    pub used_vlm: bool,
    pub used_bedrock: bool,
}

/// Bounded conversation log, oldest first.
#[derive(Debug, Default)]
pub struct ConversationHistory {
    turns: Mutex<VecDeque<ConversationTurn>>,
}

impl ConversationHistory {
    pub fn push(&self, turn: ConversationTurn) {
        let mut turns = self.turns.lock();
        turns.push_back(turn);
        while turns.len() > HISTORY_LIMIT {
            turns.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.turns.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.turns.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An assistant that answers questions about the current scene.
#[async_trait]
pub trait NavigationAgent: Send + Sync {
    async fn process_query(
        &self,
        query: &str,
        frame: Option<&RgbImage>,
        cv: &CvPayload,
    ) -> AgentResponse;

    fn history(&self) -> Vec<ConversationTurn>;

    fn clear_history(&self);

    fn agent_type(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(query: &str) -> ConversationTurn {
        ConversationTurn {
            timestamp: Utc::now(),
            query: query.to_string(),
            response: "ok".to_string(),
            safety_status: "CLEAR - No obstacles detected".to_string(),
            num_objects: 0,
            used_vlm: false,
            used_bedrock: false,
        }
    }

    #[test]
    fn test_history_keeps_last_five() {
        let history = ConversationHistory::default();
        for i in 0..8 {
            history.push(turn(&format!("q{}", i)));
        }
        let turns = history.snapshot();
        assert_eq!(turns.len(), HISTORY_LIMIT);
        assert_eq!(turns[0].query, "q3");
        assert_eq!(turns[4].query, "q7");
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_failure_response_shape() {
        let response = AgentResponse::failure("Missing required key: objects");
        assert_eq!(response.safety_status, "UNKNOWN");
        assert!(!response.haptic_feedback.enabled);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], "Missing required key: objects");
        assert!(json["cv_summary"].is_null());
    }

    #[test]
    fn test_summary_groups_positions() {
        let report = SceneReport::empty();
        let summary = CvSummary::from_report(&report, true);
        assert_eq!(summary.total_objects, 0);
        assert_eq!(summary.objects_by_position, Some(ObjectsByPosition::default()));
        assert!(CvSummary::from_report(&report, false).objects_by_position.is_none());
    }
}
