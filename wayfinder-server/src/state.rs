//! Shared state behind every route

use chrono::{DateTime, Utc};
use image::RgbImage;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use wayfinder_agent::{AgentFactory, AgentResponse, NavigationAgent, NavigationTools, HISTORY_LIMIT};
use wayfinder_core::{SceneReport, Settings};
use wayfinder_eye::{load_detector, FrameAnalysis, FrameAnalyzer};

#[cfg(feature = "camera")]
use wayfinder_eye::camera::CameraManager;

/// Reports buffered per websocket subscriber before it starts lagging.
const STREAM_CAPACITY: usize = 16;

/// The most recent analyzed frame.
#[derive(Debug, Clone)]
pub struct LatestDetection {
    pub report: SceneReport,
    pub frame: Arc<RgbImage>,
    pub annotated: Arc<RgbImage>,
    pub latency_ms: f64,
}

/// One question and the answer it got.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: AgentResponse,
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub analyzer: Arc<FrameAnalyzer>,
    pub tools: Arc<NavigationTools>,
    agent: Arc<dyn NavigationAgent>,
    latest: Arc<RwLock<Option<LatestDetection>>>,
    exchanges: Arc<RwLock<VecDeque<Exchange>>>,
    reports: broadcast::Sender<SceneReport>,
    #[cfg(feature = "camera")]
    camera: Option<Arc<CameraManager>>,
}

impl AppState {
    pub fn new(settings: Settings, analyzer: FrameAnalyzer, agent: Arc<dyn NavigationAgent>) -> Self {
        let (reports, _) = broadcast::channel(STREAM_CAPACITY);
        let tools = NavigationTools::new(settings.google_maps_api_key.as_deref());
        Self {
            settings: Arc::new(settings),
            analyzer: Arc::new(analyzer),
            tools: Arc::new(tools),
            agent,
            latest: Arc::new(RwLock::new(None)),
            exchanges: Arc::new(RwLock::new(VecDeque::new())),
            reports,
            #[cfg(feature = "camera")]
            camera: None,
        }
    }

    /// Detector, analyzer and agent built from settings.
    pub fn from_settings(settings: Settings) -> Self {
        let detector = load_detector(&settings);
        let analyzer = FrameAnalyzer::new(detector, &settings);
        let agent = AgentFactory::create(&settings);
        Self::new(settings, analyzer, agent)
    }

    #[cfg(feature = "camera")]
    pub fn with_camera(mut self, camera: Arc<CameraManager>) -> Self {
        self.camera = Some(camera);
        self
    }

    #[cfg(feature = "camera")]
    pub fn camera(&self) -> Option<&Arc<CameraManager>> {
        self.camera.as_ref()
    }

    pub fn camera_available(&self) -> bool {
        #[cfg(feature = "camera")]
        {
            self.camera.is_some()
        }
        #[cfg(not(feature = "camera"))]
        {
            false
        }
    }

    /// Store a fresh analysis and push its report to stream subscribers.
    pub fn publish(&self, frame: RgbImage, analysis: FrameAnalysis) -> SceneReport {
        let report = analysis.report.clone();
        *self.latest.write() = Some(LatestDetection {
            report: analysis.report,
            frame: Arc::new(frame),
            annotated: Arc::new(analysis.annotated),
            latency_ms: analysis.latency_ms,
        });
        // No subscribers is not an error.
        if self.reports.send(report.clone()).is_err() {
            debug!("No stream subscribers for latest report");
        }
        report
    }

    pub fn latest(&self) -> Option<LatestDetection> {
        self.latest.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SceneReport> {
        self.reports.subscribe()
    }

    /// Shared handle; agents keep their history behind their own lock, so
    /// concurrent queries never wait on each other here.
    pub fn agent(&self) -> Arc<dyn NavigationAgent> {
        self.agent.clone()
    }

    pub fn record_exchange(&self, query: &str, response: AgentResponse) {
        let mut exchanges = self.exchanges.write();
        exchanges.push_back(Exchange {
            timestamp: Utc::now(),
            query: query.to_string(),
            response,
        });
        while exchanges.len() > HISTORY_LIMIT {
            exchanges.pop_front();
        }
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.exchanges.read().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.exchanges.write().clear();
        self.agent.clear_history();
    }

    /// Forget the last detection and every conversation.
    pub fn reset(&self) {
        *self.latest.write() = None;
        self.clear_history();
    }
}
