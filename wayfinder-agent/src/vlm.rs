//! Scene descriptions from a vision-language model, grounded on detections

use crate::mock::MockResponder;
use image::RgbImage;
use std::sync::Arc;
use tracing::{info, warn};
use wayfinder_core::{SceneReport, Settings};
use wayfinder_llm::{GeminiClient, VisionModel};

pub const SYSTEM_PROMPT: &str = "You are an AI assistant helping visually impaired users navigate their environment safely.

Your role is to:
1. Provide clear, concise descriptions of the scene
2. Prioritize safety-critical information (obstacles, hazards)
3. Use spatial language (left, right, ahead, behind, distance in meters)
4. Be respectful and empowering - never patronizing
5. Focus on actionable information

When describing objects, always include:
- What the object is
- Where it is located (position and distance)
- Any immediate hazards or navigation concerns

Keep responses under 3 sentences unless asked for more detail.";

/// Wraps an optional model; without one every call answers rule-based.
#[derive(Clone, Default)]
pub struct GeminiVlmTool {
    model: Option<Arc<dyn VisionModel>>,
}

impl GeminiVlmTool {
    pub fn new(model: Option<Arc<dyn VisionModel>>) -> Self {
        Self { model }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        match GeminiClient::from_settings(settings) {
            Some(Ok(client)) => {
                info!("Gemini VLM enabled with model {}", client.model());
                Self::new(Some(Arc::new(client)))
            }
            Some(Err(e)) => {
                warn!("Could not initialize Gemini: {}. Using rule-based responses.", e);
                Self::default()
            }
            None => {
                info!("Gemini API not configured. Using rule-based responses.");
                Self::default()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    /// Describe the scene for `query`, falling back to rule-based text
    /// when no model is configured or the call fails.
    pub async fn generate_description(
        &self,
        frame: Option<&RgbImage>,
        report: &SceneReport,
        query: &str,
    ) -> String {
        let Some(model) = &self.model else {
            return MockResponder::describe(report, query);
        };
        match model.describe(frame, &build_prompt(report, query)).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{} call failed: {}. Falling back to rule-based response.", model.name(), e);
                MockResponder::describe(report, query)
            }
        }
    }
}

pub fn build_prompt(report: &SceneReport, query: &str) -> String {
    format!(
        "{}\n\nDETECTED OBJECTS (from computer vision):\n{}\n\nUSER QUERY: {}\n\n\
         Provide a natural, conversational response that helps the user understand their \
         environment and navigate safely.",
        SYSTEM_PROMPT,
        format_cv_data(report),
        query
    )
}

/// One line per object, then the critical alerts.
pub fn format_cv_data(report: &SceneReport) -> String {
    if report.objects.is_empty() {
        return "No objects detected.".to_string();
    }

    let mut lines: Vec<String> = report
        .objects
        .iter()
        .map(|obj| {
            let distance = obj
                .distance_m
                .map(|d| format!("{:.1} meters", d))
                .unwrap_or_else(|| "unknown distance".to_string());
            format!("- {} at {}, positioned to your {}", obj.class_name, distance, obj.position)
        })
        .collect();

    if !report.critical_alerts.is_empty() {
        lines.push("\nCRITICAL ALERTS (very close objects):".to_string());
        for alert in &report.critical_alerts {
            if let Some(d) = alert.distance_m {
                lines.push(format!("⚠ {} only {:.1}m away!", alert.class_name, d));
            }
        }
    }
    lines.join("\n")
}
