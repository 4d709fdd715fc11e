// Application settings: defaults, optional config file, then environment

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "wayfinder.toml";

/// Dotenv file read from the working directory, below the real environment.
pub const DEFAULT_ENV_FILE: &str = ".env";

const GEMINI_KEY_PLACEHOLDER: &str = "your_gemini_api_key_here";

/// Runtime settings for the navigation assistant.
///
/// Every field can be overridden by an environment variable of the same
/// name in any case (`GEMINI_API_KEY`, `use_bedrock`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // AWS
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_session_token: Option<String>,
    pub aws_region: String,

    // Bedrock agent
    pub bedrock_agent_id: Option<String>,
    pub bedrock_agent_alias_id: Option<String>,
    pub bedrock_session_id: String,
    /// Replaces the regional Bedrock Agent Runtime endpoint.
    pub bedrock_endpoint_url: Option<String>,

    // Gemini
    pub gemini_api_key: String,
    pub gemini_model: String,

    pub google_maps_api_key: Option<String>,

    // Feature flags
    pub use_bedrock: bool,
    pub use_gemini: bool,
    pub mock_mode: bool,

    // Detection
    pub yolo_model_path: PathBuf,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,

    // Performance
    pub target_fps: u32,
    pub max_detection_latency_ms: u64,

    // Monocular distance estimation
    pub focal_length_mm: f32,
    pub sensor_height_mm: f32,
    pub avg_person_height_m: f32,

    // Capture and serving
    pub camera_id: u32,
    pub bind_address: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            aws_access_key_id: String::new(),
            aws_secret_access_key: String::new(),
            aws_session_token: None,
            aws_region: "us-east-1".to_string(),
            bedrock_agent_id: None,
            bedrock_agent_alias_id: None,
            bedrock_session_id: "demo-session".to_string(),
            bedrock_endpoint_url: None,
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash-exp".to_string(),
            google_maps_api_key: None,
            use_bedrock: false,
            use_gemini: false,
            mock_mode: true,
            yolo_model_path: PathBuf::from("models/yolov8n.onnx"),
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            target_fps: 30,
            max_detection_latency_ms: 100,
            focal_length_mm: 4.0,
            sensor_height_mm: 6.0,
            avg_person_height_m: 1.7,
            camera_id: 0,
            bind_address: "127.0.0.1:8501".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Which integrations are configured and switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStatus {
    pub aws_credentials: bool,
    pub gemini_api: bool,
    pub bedrock_agent: bool,
    pub use_bedrock: bool,
    pub use_gemini: bool,
    pub mock_mode: bool,
}

impl Settings {
    /// Field names accepted from the environment.
    pub const FIELDS: &'static [&'static str] = &[
        "aws_access_key_id",
        "aws_secret_access_key",
        "aws_session_token",
        "aws_region",
        "bedrock_agent_id",
        "bedrock_agent_alias_id",
        "bedrock_session_id",
        "bedrock_endpoint_url",
        "gemini_api_key",
        "gemini_model",
        "google_maps_api_key",
        "use_bedrock",
        "use_gemini",
        "mock_mode",
        "yolo_model_path",
        "confidence_threshold",
        "iou_threshold",
        "target_fps",
        "max_detection_latency_ms",
        "focal_length_mm",
        "sensor_height_mm",
        "avg_person_height_m",
        "camera_id",
        "bind_address",
        "log_level",
    ];

    /// Load settings from `path` (or `wayfinder.toml` if present), a `.env`
    /// file if present, and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_file = PathBuf::from(DEFAULT_ENV_FILE);
        let env = Self::merge_env_file(
            env_file.exists().then_some(env_file.as_path()),
            std::env::vars().collect(),
        )?;
        let file = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Configuration(format!(
                        "Config file not found: {}",
                        p.display()
                    )));
                }
                Some(p.to_path_buf())
            }
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }
        };
        Self::from_sources(file.as_deref(), env)
    }

    /// Fold a dotenv file under `process`: keys the process environment
    /// already sets (in any case) keep their process value.
    pub fn merge_env_file(
        env_file: Option<&Path>,
        process: HashMap<String, String>,
    ) -> Result<HashMap<String, String>> {
        let mut merged: HashMap<String, String> = process
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        let Some(env_file) = env_file else {
            return Ok(merged);
        };

        debug!("Reading variables from {}", env_file.display());
        let entries = dotenvy::from_path_iter(env_file).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", env_file.display(), e))
        })?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| {
                Error::Configuration(format!("Invalid line in {}: {}", env_file.display(), e))
            })?;
            merged.entry(key.to_lowercase()).or_insert(value);
        }
        Ok(merged)
    }

    /// Build settings from an optional file and an explicit variable map.
    ///
    /// Variables stay strings until serde sees the target field, so IDs and
    /// keys that look numeric are kept verbatim.
    pub fn from_sources(file: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let env: config::Map<String, String> = env
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .filter(|(k, v)| Self::FIELDS.contains(&k.as_str()) && !v.trim().is_empty())
            .collect();
        debug!("{} settings overridden from environment", env.len());

        let mut builder = config::Config::builder();
        if let Some(file) = file {
            info!("Loading settings from {}", file.display());
            builder = builder.add_source(config::File::from(file).required(true));
        }
        builder = builder.add_source(config::Environment::default().source(Some(env)));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults with mock mode forced on, used when loading fails.
    pub fn fallback() -> Self {
        Self {
            mock_mode: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Validation(
                "confidence_threshold must be between 0 and 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(Error::Validation(
                "iou_threshold must be between 0 and 1".to_string(),
            ));
        }
        if self.target_fps == 0 || self.target_fps > 120 {
            return Err(Error::Validation(
                "target_fps must be between 1 and 120".to_string(),
            ));
        }
        if !(self.focal_length_mm > 0.0 && self.sensor_height_mm > 0.0) {
            return Err(Error::Validation(
                "focal_length_mm and sensor_height_mm must be positive".to_string(),
            ));
        }
        if !(self.avg_person_height_m > 0.0) {
            return Err(Error::Validation(
                "avg_person_height_m must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn has_aws_credentials(&self) -> bool {
        !self.aws_access_key_id.is_empty() && !self.aws_secret_access_key.is_empty()
    }

    pub fn has_gemini_key(&self) -> bool {
        !self.gemini_api_key.is_empty() && self.gemini_api_key != GEMINI_KEY_PLACEHOLDER
    }

    pub fn has_bedrock_agent(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.is_empty());
        set(&self.bedrock_agent_id) && set(&self.bedrock_agent_alias_id)
    }

    pub fn feature_status(&self) -> FeatureStatus {
        FeatureStatus {
            aws_credentials: self.has_aws_credentials(),
            gemini_api: self.has_gemini_key(),
            bedrock_agent: self.has_bedrock_agent(),
            use_bedrock: self.use_bedrock && self.has_bedrock_agent(),
            use_gemini: self.use_gemini && self.has_gemini_key(),
            mock_mode: self.mock_mode,
        }
    }
}
