// HTTP API for the navigation assistant

use crate::state::AppState;
use crate::static_files::serve_static;
use crate::websocket::stream_handler;
use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequest, Request, State},
    http::{header, Response as HttpResponse, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use image::RgbImage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use wayfinder_agent::{AgentFactory, CvPayload};
use wayfinder_core::SceneReport;
use wayfinder_eye::{decode_image, encode_jpeg, AnalyzerStats, CAMERA_SUPPORTED};

/// Uploaded frames above this size are rejected.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

const ANNOTATED_JPEG_QUALITY: u8 = 85;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct DetectorStatus {
    backend: &'static str,
    loaded: bool,
    classes: usize,
}

#[derive(Debug, Serialize)]
struct AgentStatus {
    #[serde(rename = "type")]
    agent_type: &'static str,
    available: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    version: String,
    features: wayfinder_core::FeatureStatus,
    detector: DetectorStatus,
    agent: AgentStatus,
    analyzer: AnalyzerStats,
    camera_supported: bool,
    camera_available: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectResponse {
    pub report: SceneReport,
    pub latency_ms: f64,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    #[serde(default = "current_location")]
    pub start: String,
    pub destination: String,
}

fn current_location() -> String {
    "current location".to_string()
}

/// Create HTTP router with all API routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/status", get(status_handler))
        .route("/api/v1/detect", post(detect_handler))
        .route("/api/v1/detection", get(detection_handler))
        .route("/api/v1/detection/annotated", get(annotated_handler))
        .route("/api/v1/query", post(query_handler))
        .route("/api/v1/history", get(history_handler).delete(clear_history_handler))
        .route("/api/v1/reset", post(reset_handler))
        .route("/api/v1/snapshot", post(snapshot_handler))
        .route("/api/v1/tools/localization", get(localization_handler))
        .route("/api/v1/tools/route", post(route_handler))
        .route("/api/v1/stream", get(stream_handler))
        .fallback(serve_static)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub(crate) fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.to_string(),
        }),
    )
        .into_response()
}

/// `Json` body extractor whose rejections use the `ErrorResponse` shape.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> Response {
    let code = match &rejection {
        JsonRejection::JsonDataError(_) => "INVALID_REQUEST",
        JsonRejection::JsonSyntaxError(_) => "INVALID_JSON",
        JsonRejection::MissingJsonContentType(_) => "UNSUPPORTED_MEDIA_TYPE",
        _ => "INVALID_BODY",
    };
    error_response(rejection.status(), code, rejection.body_text())
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let detector = state.analyzer.detector();
    let agent_type = state.agent().agent_type();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        features: state.settings.feature_status(),
        detector: DetectorStatus {
            backend: detector.backend(),
            loaded: detector.is_loaded(),
            classes: detector.class_names().len(),
        },
        agent: AgentStatus {
            agent_type,
            available: AgentFactory::available_agents(&state.settings),
        },
        analyzer: state.analyzer.stats(),
        camera_supported: CAMERA_SUPPORTED,
        camera_available: state.camera_available(),
    })
}

/// Analyze off the async runtime, then publish the result.
async fn analyze_and_publish(state: &AppState, frame: RgbImage) -> Response {
    let analyzer = state.analyzer.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let analysis = analyzer.analyze(&frame);
        (frame, analysis)
    })
    .await;

    match joined {
        Ok((frame, Ok(analysis))) => {
            let latency_ms = analysis.latency_ms;
            let report = state.publish(frame, analysis);
            Json(DetectResponse { report, latency_ms }).into_response()
        }
        Ok((_, Err(e))) => {
            warn!("Frame analysis failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "DETECTION_FAILED", e.to_string())
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            format!("Analysis task failed: {}", e),
        ),
    }
}

async fn detect_handler(State(state): State<AppState>, body: Bytes) -> Response {
    if body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "EMPTY_BODY", "Request body must contain an image");
    }
    let frame = match decode_image(&body) {
        Ok(frame) => frame,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "INVALID_IMAGE", e.to_string()),
    };
    analyze_and_publish(&state, frame).await
}

async fn detection_handler(State(state): State<AppState>) -> Response {
    match state.latest() {
        Some(latest) => Json(DetectResponse {
            report: latest.report,
            latency_ms: latest.latency_ms,
        })
        .into_response(),
        None => no_detection(StatusCode::NOT_FOUND),
    }
}

async fn annotated_handler(State(state): State<AppState>) -> Response {
    let Some(latest) = state.latest() else {
        return no_detection(StatusCode::NOT_FOUND);
    };
    match encode_jpeg(&latest.annotated, ANNOTATED_JPEG_QUALITY) {
        Ok(jpeg) => HttpResponse::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "image/jpeg")
            .body(Body::from(jpeg))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "ENCODE_FAILED", e.to_string()),
    }
}

fn no_detection(status: StatusCode) -> Response {
    error_response(status, "NO_DETECTION", "No frame has been analyzed yet")
}

async fn query_handler(State(state): State<AppState>, ApiJson(request): ApiJson<QueryRequest>) -> Response {
    let query = request.query.trim();
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "EMPTY_QUERY", "Query must not be empty");
    }
    let Some(latest) = state.latest() else {
        return no_detection(StatusCode::CONFLICT);
    };

    let payload = CvPayload::from(&latest.report);
    let agent = state.agent();
    let response = agent
        .process_query(query, Some(latest.frame.as_ref()), &payload)
        .await;
    info!("Answered query ({}): {}", response.safety_status, query);

    state.record_exchange(query, response.clone());
    Json(response).into_response()
}

async fn history_handler(State(state): State<AppState>) -> impl IntoResponse {
    let agent = state.agent();
    Json(serde_json::json!({
        "agent_type": agent.agent_type(),
        "exchanges": state.exchanges(),
        "agent_history": agent.history(),
    }))
}

async fn clear_history_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.clear_history();
    Json(serde_json::json!({ "cleared": true }))
}

async fn reset_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.reset();
    info!("Session reset");
    Json(serde_json::json!({ "reset": true }))
}

async fn snapshot_handler(State(state): State<AppState>) -> Response {
    match capture_frame(&state).await {
        Ok(frame) => analyze_and_publish(&state, frame).await,
        Err(response) => response,
    }
}

#[cfg(feature = "camera")]
async fn capture_frame(state: &AppState) -> Result<RgbImage, Response> {
    let Some(camera) = state.camera().cloned() else {
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "CAMERA_UNAVAILABLE",
            "No camera attached to this server",
        ));
    };
    let captured = tokio::task::spawn_blocking(move || {
        camera.initialize()?;
        camera.capture_frame()
    })
    .await;
    match captured {
        Ok(Ok(frame)) => Ok(frame),
        Ok(Err(e)) => Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "CAMERA_UNAVAILABLE",
            e.to_string(),
        )),
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            format!("Capture task failed: {}", e),
        )),
    }
}

#[cfg(not(feature = "camera"))]
async fn capture_frame(_state: &AppState) -> Result<RgbImage, Response> {
    Err(error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "CAMERA_UNAVAILABLE",
        "Camera support is not compiled into this build",
    ))
}

async fn localization_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.tools.localization())
}

async fn route_handler(State(state): State<AppState>, ApiJson(request): ApiJson<RouteRequest>) -> Response {
    if request.destination.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "EMPTY_DESTINATION", "Destination must not be empty");
    }
    Json(state.tools.plan_route(&request.start, &request.destination)).into_response()
}
