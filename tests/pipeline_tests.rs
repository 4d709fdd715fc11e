// End-to-end: detector output through distance estimation, payload and agent

use image::RgbImage;
use std::sync::Arc;
use wayfinder_agent::{
    AgentFactory, CvPayload, GeminiVlmTool, HapticPattern, LocalNavigationAgent, NavigationAgent,
    NavigationTools,
};
use wayfinder_core::{BoundingBox, Position, SafetyLevel, SafetyStatus, Settings};
use wayfinder_eye::error::Result as VisionResult;
use wayfinder_eye::{FrameAnalyzer, ObjectDetector, RawDetection};

/// Returns a fixed set of boxes for a 640x480 frame.
struct FixedDetector(Vec<RawDetection>);

impl ObjectDetector for FixedDetector {
    fn detect(&self, _frame: &RgbImage) -> VisionResult<Vec<RawDetection>> {
        Ok(self.0.clone())
    }

    fn backend(&self) -> &'static str {
        "fixed"
    }
}

fn raw(class_name: &str, confidence: f32, bbox: BoundingBox) -> RawDetection {
    RawDetection {
        class_id: 0,
        class_name: class_name.to_string(),
        confidence,
        bbox,
    }
}

/// Default camera: 4 mm lens on a 6 mm sensor, so 320 px focal length at 480 px.
fn street_scene() -> FrameAnalyzer {
    let detector = FixedDetector(vec![
        // 1.7 m * 320 / 272 = 2.0 m, left third
        raw("person", 0.876, BoundingBox::new(100.0, 100.0, 200.0, 372.0)),
        // 0.9 m * 320 / 360 = 0.8 m, right third
        raw("chair", 0.91, BoundingBox::new(500.0, 100.0, 600.0, 460.0)),
    ]);
    FrameAnalyzer::new(Arc::new(detector), &Settings::default())
}

#[test]
fn test_scene_report_is_sorted_and_assessed() {
    let analysis = street_scene().analyze(&RgbImage::new(640, 480)).unwrap();
    let report = &analysis.report;

    assert_eq!(report.num_objects, 2);
    assert_eq!(report.objects[0].class_name, "chair");
    assert_eq!(report.objects[0].distance_m, Some(0.8));
    assert_eq!(report.objects[0].position, Position::Right);
    assert_eq!(report.objects[0].safety_level, SafetyLevel::Critical);
    assert_eq!(report.objects[1].class_name, "person");
    assert_eq!(report.objects[1].distance_m, Some(2.0));
    assert_eq!(report.objects[1].position, Position::Left);
    assert_eq!(report.objects[1].confidence, 0.88);

    assert_eq!(report.critical_alerts.len(), 1);
    assert_eq!(report.safety_status, SafetyStatus::Danger);
    assert_eq!(analysis.annotated.dimensions(), (640, 480));
}

#[test]
fn test_payload_round_trips_through_tools() {
    let analysis = street_scene().analyze(&RgbImage::new(640, 480)).unwrap();
    let payload = CvPayload::from(&analysis.report);

    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["objects"][0]["class"], "chair");

    let report = NavigationTools::default().perceive(&payload).unwrap();
    assert_eq!(report.num_objects, 2);
    assert_eq!(report.safety_status, SafetyStatus::Danger);
}

#[tokio::test]
async fn test_local_agent_warns_about_closest_obstacle() {
    let analysis = street_scene().analyze(&RgbImage::new(640, 480)).unwrap();
    let payload = CvPayload::from(&analysis.report);
    let agent = LocalNavigationAgent::new(GeminiVlmTool::default(), NavigationTools::default());

    let response = agent.process_query("Is it safe to walk?", None, &payload).await;
    assert!(response
        .text_response
        .starts_with("Caution! There is a chair only 0.8 meters away on your right."));
    assert!(response.haptic_feedback.enabled);
    assert_eq!(response.haptic_feedback.pattern, Some(HapticPattern::FastPulse));
    assert_eq!(response.haptic_feedback.direction, Some(Position::Right));
    assert_eq!(response.safety_status, "DANGER - Immediate obstacles detected");
}

#[tokio::test]
async fn test_factory_agent_answers_without_credentials() {
    let settings = Settings::default();
    let agent = AgentFactory::create(&settings);
    let analysis = street_scene().analyze(&RgbImage::new(640, 480)).unwrap();
    let frame = RgbImage::new(640, 480);

    let response = agent
        .process_query("Where is the person?", Some(&frame), &CvPayload::from(&analysis.report))
        .await;
    assert!(!response.used_bedrock);
    assert!(response.error.is_none());
    assert_eq!(agent.history().len(), 1);
}
