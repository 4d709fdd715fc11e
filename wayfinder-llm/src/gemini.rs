//! Gemini `generateContent` client with inline JPEG frames

use crate::error::{LLMError, Result};
use crate::provider::VisionModel;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use wayfinder_core::Settings;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const JPEG_QUALITY: u8 = 85;

pub struct GeminiClient {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LLMError::MissingApiKey("Gemini".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            api_key,
            model: model.into(),
            client,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Client for the configured key, if Gemini is switched on and keyed.
    pub fn from_settings(settings: &Settings) -> Option<Result<Self>> {
        let status = settings.feature_status();
        status
            .use_gemini
            .then(|| Self::new(settings.gemini_api_key.clone(), settings.gemini_model.clone()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> Result<String> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(LLMError::InvalidResponse("Invalid base URL".to_string()));
        }
        Ok(format!(
            "{}/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        ))
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn describe(&self, image: Option<&RgbImage>, prompt: &str) -> Result<String> {
        let jpeg = image.map(encode_jpeg_base64).transpose()?;
        let body = build_request(prompt, jpeg.as_deref());
        let url = self.endpoint()?;
        debug!("Gemini request to {} (image: {})", url, jpeg.is_some());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, &text));
        }

        let json: Value = response.json().await?;
        extract_text(&json)
    }
}

fn encode_jpeg_base64(image: &RgbImage) -> Result<String> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(image)?;
    Ok(STANDARD.encode(buf))
}

/// `generateContent` body: prompt text, then the frame if present.
pub fn build_request(prompt: &str, jpeg_base64: Option<&str>) -> Value {
    let mut parts = vec![json!({ "text": prompt })];
    if let Some(data) = jpeg_base64 {
        parts.push(json!({
            "inline_data": { "mime_type": "image/jpeg", "data": data }
        }));
    }
    json!({ "contents": [{ "role": "user", "parts": parts }] })
}

/// Concatenated text parts of the first candidate.
pub fn extract_text(json: &Value) -> Result<String> {
    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        return Err(LLMError::InvalidResponse(format!("Prompt blocked: {}", reason)));
    }
    let parts = json["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| LLMError::InvalidResponse("No candidates in response".to_string()))?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.trim().is_empty() {
        return Err(LLMError::InvalidResponse("Empty response text".to_string()));
    }
    Ok(text)
}
