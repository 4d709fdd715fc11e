use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API key not set for provider: {0}")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Malformed event stream: {0}")]
    EventStream(String),

    #[error("Agent exception {kind}: {message}")]
    AgentException { kind: String, message: String },

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, LLMError>;

impl LLMError {
    /// Map a non-success HTTP status to the closest error kind.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => LLMError::AuthenticationFailed,
            429 => LLMError::RateLimit,
            _ => LLMError::InvalidResponse(format!("HTTP {}: {}", status, body)),
        }
    }
}
