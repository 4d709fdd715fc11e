// Wayfinder command line interface
// Serve the assistant, analyze single images and ask questions about them

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wayfinder_agent::{AgentFactory, AgentResponse, CvPayload};
use wayfinder_core::{SceneReport, Settings};
use wayfinder_eye::{load_detector, FrameAnalysis, FrameAnalyzer, ModelManager};
use wayfinder_server::AppState;

#[derive(Parser)]
#[command(name = "wayfinder")]
#[command(about = "Wayfinder - obstacle detection and navigation help from a camera", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to wayfinder.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP/WebSocket server
    Serve {
        /// Address to bind, overrides bind_address
        #[arg(long)]
        bind: Option<String>,

        /// Continuously analyze the webcam
        #[arg(long)]
        live: bool,
    },

    /// Analyze one image and print the scene report
    Detect {
        image: PathBuf,

        /// Write the annotated frame here
        #[arg(long)]
        annotated: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze an image and ask the navigation agent about it
    Ask { image: PathBuf, query: String },

    /// Show configured features, or a running server's status
    Status {
        /// Query a running server instead of local settings
        #[arg(long)]
        server: Option<String>,
    },

    /// Capture and analyze a single webcam frame
    Snapshot {
        /// Save the annotated frame here
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Download the YOLOv8n ONNX weights
    DownloadModel {
        /// Target directory (defaults to the directory of yolo_model_path)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = Settings::load(cli.config.as_deref());
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        loaded
            .as_ref()
            .map(|s| s.log_level.clone())
            .unwrap_or_else(|_| "info".to_string())
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();

    let settings = loaded.unwrap_or_else(|e| {
        warn!("Failed to load settings: {}. Using mock-mode defaults.", e);
        Settings::fallback()
    });

    match cli.command {
        Commands::Serve { bind, live } => serve(settings, bind, live).await,
        Commands::Detect {
            image,
            annotated,
            json,
        } => detect(&settings, &image, annotated.as_deref(), json),
        Commands::Ask { image, query } => ask(&settings, &image, &query).await,
        Commands::Status { server } => status(&settings, server.as_deref()).await,
        Commands::Snapshot { out } => snapshot(&settings, out.as_deref()),
        Commands::DownloadModel { dir } => download_model(&settings, dir).await,
    }
}

async fn serve(settings: Settings, bind: Option<String>, live: bool) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| settings.bind_address.clone());
    let state = AppState::from_settings(settings);
    let state = attach_camera(state, live)?;
    wayfinder_server::serve(state, &bind).await
}

#[cfg(feature = "camera")]
fn attach_camera(state: AppState, live: bool) -> anyhow::Result<AppState> {
    use std::sync::Arc;
    use wayfinder_eye::camera::CameraManager;

    let camera = Arc::new(CameraManager::from_settings(&state.settings));
    let state = state.with_camera(camera);
    if live && wayfinder_server::live::spawn_live_capture(state.clone()).is_some() {
        info!("Live mode enabled");
    }
    Ok(state)
}

#[cfg(not(feature = "camera"))]
fn attach_camera(state: AppState, live: bool) -> anyhow::Result<AppState> {
    if live {
        bail!("--live needs a build with the `camera` feature");
    }
    Ok(state)
}

fn analyze_file(settings: &Settings, path: &Path) -> anyhow::Result<(image::RgbImage, FrameAnalysis)> {
    let frame = image::open(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?
        .to_rgb8();
    let analyzer = FrameAnalyzer::new(load_detector(settings), settings);
    if !analyzer.is_model_loaded() {
        warn!("Detector not loaded; run `wayfinder download-model` first");
    }
    let analysis = analyzer.analyze(&frame)?;
    Ok((frame, analysis))
}

fn detect(settings: &Settings, image: &Path, annotated: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let (_, analysis) = analyze_file(settings, image)?;

    if let Some(out) = annotated {
        analysis
            .annotated
            .save(out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        info!("Annotated frame written to {}", out.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis.report)?);
    } else {
        println!("{}", format_report(&analysis.report));
        println!("Latency: {:.1}ms", analysis.latency_ms);
    }
    Ok(())
}

async fn ask(settings: &Settings, image: &Path, query: &str) -> anyhow::Result<()> {
    let (frame, analysis) = analyze_file(settings, image)?;
    let agent = AgentFactory::create(settings);
    let payload = CvPayload::from(&analysis.report);
    let response = agent.process_query(query, Some(&frame), &payload).await;
    println!("{}", format_response(&response));
    Ok(())
}

async fn status(settings: &Settings, server: Option<&str>) -> anyhow::Result<()> {
    if let Some(server) = server {
        let url = format!("{}/api/v1/status", server.trim_end_matches('/'));
        let response = reqwest::get(&url)
            .await
            .with_context(|| format!("Wayfinder server not reachable at {}", server))?;
        if !response.status().is_success() {
            bail!("Server responded with {}", response.status());
        }
        let body: serde_json::Value = response.json().await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let features = settings.feature_status();
    let model_present = settings.yolo_model_path.exists();
    println!("Wayfinder {}", env!("CARGO_PKG_VERSION"));
    println!("  YOLO model:      {} ({})", yes_no(model_present), settings.yolo_model_path.display());
    println!("  Gemini API:      {}", yes_no(features.gemini_api));
    println!("  AWS credentials: {}", yes_no(features.aws_credentials));
    println!("  Bedrock agent:   {}", yes_no(features.bedrock_agent));
    println!("  Use Bedrock:     {}", yes_no(features.use_bedrock));
    println!("  Mock mode:       {}", yes_no(features.mock_mode));
    println!("  Camera support:  {}", yes_no(wayfinder_eye::CAMERA_SUPPORTED));
    println!("  Agents:          {}", AgentFactory::available_agents(settings).join(", "));
    Ok(())
}

#[cfg(feature = "camera")]
fn snapshot(settings: &Settings, out: Option<&Path>) -> anyhow::Result<()> {
    use wayfinder_eye::camera::CameraManager;

    let camera = CameraManager::from_settings(settings);
    camera.initialize()?;
    let frame = camera.capture_frame()?;
    camera.stop();

    let analyzer = FrameAnalyzer::new(load_detector(settings), settings);
    let analysis = analyzer.analyze(&frame)?;
    if let Some(out) = out {
        analysis
            .annotated
            .save(out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        info!("Snapshot written to {}", out.display());
    }
    println!("{}", format_report(&analysis.report));
    Ok(())
}

#[cfg(not(feature = "camera"))]
fn snapshot(_settings: &Settings, _out: Option<&Path>) -> anyhow::Result<()> {
    bail!("snapshot needs a build with the `camera` feature")
}

async fn download_model(settings: &Settings, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let manager = match dir {
        Some(dir) => ModelManager::new(dir),
        None => ModelManager::for_settings(settings),
    };
    println!("Downloading YOLOv8n into {}...", manager.model_dir().display());
    let path = manager.get_yolo_model().await?;
    println!("Model available at {}", path.display());
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn format_report(report: &SceneReport) -> String {
    let mut lines = vec![format!("{} ({} objects)", report.safety_status, report.num_objects)];
    for obj in &report.objects {
        let distance = obj
            .distance_m
            .map(|d| format!("{:.1}m", d))
            .unwrap_or_else(|| "?".to_string());
        let marker = if obj.is_alert() { "!" } else { " " };
        lines.push(format!(
            "{} {:<14} {:>6}  {:<6}  {:.2}",
            marker, obj.class_name, distance, obj.position, obj.confidence
        ));
    }
    lines.join("\n")
}

fn format_response(response: &AgentResponse) -> String {
    let mut out = response.text_response.clone();
    out.push_str(&format!("\n\nStatus: {}", response.safety_status));
    let haptic = &response.haptic_feedback;
    if haptic.enabled {
        if let (Some(pattern), Some(direction)) = (haptic.pattern, haptic.direction) {
            out.push_str(&format!("\nHaptic: {:?} towards {}", pattern, direction));
        }
    }
    if let Some(error) = &response.error {
        out.push_str(&format!("\nError: {}", error));
    }
    out
}
