//! Model manager with auto-download functionality

use crate::error::VisionError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use wayfinder_core::Settings;

/// Ultralytics YOLOv8 nano export.
pub const YOLO_V8N_URL: &str =
    "https://github.com/ultralytics/assets/releases/download/v8.2.0/yolov8n.onnx";
pub const YOLO_V8N_FILE: &str = "yolov8n.onnx";
const YOLO_V8N_CHECKSUM: &str = "";

const MAX_MODEL_SIZE: usize = 500_000_000;
const MIN_MODEL_SIZE: usize = 1024;
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// Downloads ONNX weights into a local model directory.
#[derive(Debug, Clone)]
pub struct ModelManager {
    model_dir: PathBuf,
}

impl ModelManager {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    /// Directory that holds the configured YOLO model.
    pub fn for_settings(settings: &Settings) -> Self {
        let dir = settings
            .yolo_model_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir)
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn ensure_model_dir(&self) -> Result<PathBuf, VisionError> {
        if !self.model_dir.exists() {
            fs::create_dir_all(&self.model_dir)?;
            info!("Created model directory: {:?}", self.model_dir);
        }
        Ok(self.model_dir.clone())
    }

    /// Path the named model would occupy, after name validation.
    pub fn model_path(&self, model_name: &str) -> Result<PathBuf, VisionError> {
        if model_name.is_empty() || model_name.len() > 255 {
            return Err(VisionError::Model("Invalid model name".to_string()));
        }
        if model_name.contains("..") || model_name.contains('/') || model_name.contains('\\') {
            return Err(VisionError::Model(
                "Model name contains invalid characters".to_string(),
            ));
        }
        let path = self.model_dir.join(model_name);
        if !path.starts_with(&self.model_dir) {
            return Err(VisionError::Model("Path traversal detected".to_string()));
        }
        Ok(path)
    }

    /// Download `model_name` from `url` unless it is already present.
    pub async fn ensure_model(
        &self,
        model_name: &str,
        url: &str,
        checksum: &str,
    ) -> Result<PathBuf, VisionError> {
        let model_path = self.model_path(model_name)?;

        if url.is_empty() || url.len() > 2048 {
            return Err(VisionError::Model("Invalid URL".to_string()));
        }
        if !url.starts_with("https://") {
            return Err(VisionError::Model(
                "Only HTTPS URLs are allowed for model downloads".to_string(),
            ));
        }

        if model_path.exists() {
            info!("Model {} already exists at {:?}", model_name, model_path);
            return Ok(model_path);
        }
        self.ensure_model_dir()?;

        info!("Downloading model {} from {}", model_name, url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;
        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(VisionError::Model(format!(
                "Failed to download model: HTTP {}",
                response.status()
            )));
        }
        if let Some(len) = response.content_length() {
            if len > MAX_MODEL_SIZE as u64 {
                return Err(VisionError::Model(format!(
                    "Model too large: {} bytes (max {} bytes)",
                    len, MAX_MODEL_SIZE
                )));
            }
        }

        let bytes = response.bytes().await?;
        verify_payload(model_name, &bytes, checksum)?;

        let temp_path = model_path.with_extension("onnx.part");
        fs::write(&temp_path, &bytes)?;
        if let Err(e) = fs::rename(&temp_path, &model_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        info!("Model {} saved to {:?} ({} bytes)", model_name, model_path, bytes.len());
        Ok(model_path)
    }

    /// YOLOv8n weights, downloading if needed.
    pub async fn get_yolo_model(&self) -> Result<PathBuf, VisionError> {
        self.ensure_model(YOLO_V8N_FILE, YOLO_V8N_URL, YOLO_V8N_CHECKSUM).await
    }
}

/// Size bounds plus optional SHA-256 check on downloaded bytes.
fn verify_payload(model_name: &str, bytes: &[u8], checksum: &str) -> Result<(), VisionError> {
    if bytes.len() > MAX_MODEL_SIZE {
        return Err(VisionError::Model(format!(
            "Downloaded model too large: {} bytes (max {} bytes)",
            bytes.len(),
            MAX_MODEL_SIZE
        )));
    }
    if bytes.len() < MIN_MODEL_SIZE {
        return Err(VisionError::Model(
            "Downloaded file too small, likely corrupted".to_string(),
        ));
    }
    if checksum.is_empty() {
        info!("Checksum verification skipped for {}", model_name);
        return Ok(());
    }

    let computed = hex::encode(Sha256::digest(bytes));
    if !computed.eq_ignore_ascii_case(checksum) {
        return Err(VisionError::Model(format!(
            "Checksum mismatch for model {}: expected {}, got {}",
            model_name, checksum, computed
        )));
    }
    info!("Verified checksum for model {}", model_name);
    Ok(())
}
