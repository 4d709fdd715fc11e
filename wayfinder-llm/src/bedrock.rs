//! Bedrock Agent Runtime `InvokeAgent` through the AWS SDK

use crate::error::{LLMError, Result};
use crate::provider::AgentRuntime;
use async_trait::async_trait;
use aws_sdk_bedrockagentruntime::config::timeout::TimeoutConfig;
use aws_sdk_bedrockagentruntime::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_bedrockagentruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockagentruntime::operation::invoke_agent::InvokeAgentError;
use aws_sdk_bedrockagentruntime::types::error::ResponseStreamError;
use aws_sdk_bedrockagentruntime::types::ResponseStream;
use aws_sdk_bedrockagentruntime::{Client, Config};
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;
use wayfinder_core::Settings;

pub const EMPTY_COMPLETION: &str = "No response from Bedrock agent.";
const REQUEST_TIMEOUT_SECS: u64 = 120;
const CREDENTIALS_SOURCE: &str = "wayfinder-settings";

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
    pub agent_id: String,
    pub agent_alias_id: String,
    /// Replaces the regional endpoint (VPC endpoints, local stubs).
    pub endpoint_url: Option<String>,
}

impl BedrockConfig {
    /// Present only when credentials and both agent ids are configured.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        if !(settings.has_aws_credentials() && settings.has_bedrock_agent()) {
            return None;
        }
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        Some(Self {
            access_key_id: settings.aws_access_key_id.clone(),
            secret_access_key: settings.aws_secret_access_key.clone(),
            session_token: non_empty(&settings.aws_session_token),
            region: settings.aws_region.clone(),
            agent_id: settings.bedrock_agent_id.clone().unwrap_or_default(),
            agent_alias_id: settings.bedrock_agent_alias_id.clone().unwrap_or_default(),
            endpoint_url: non_empty(&settings.bedrock_endpoint_url),
        })
    }
}

pub struct BedrockAgentClient {
    client: Client,
    agent_id: String,
    agent_alias_id: String,
}

impl BedrockAgentClient {
    pub fn new(config: BedrockConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            config.session_token,
            None,
            CREDENTIALS_SOURCE,
        );
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build();

        let mut builder = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .timeout_config(timeouts);
        if let Some(url) = config.endpoint_url {
            debug!("Bedrock endpoint overridden: {}", url);
            builder = builder.endpoint_url(url);
        }

        Self {
            client: Client::from_conf(builder.build()),
            agent_id: config.agent_id,
            agent_alias_id: config.agent_alias_id,
        }
    }
}

#[async_trait]
impl AgentRuntime for BedrockAgentClient {
    fn name(&self) -> &'static str {
        "bedrock-agent"
    }

    async fn invoke_agent(&self, session_id: &str, input_text: &str) -> Result<String> {
        if session_id.is_empty() {
            return Err(LLMError::Provider("Session id cannot be empty".to_string()));
        }

        debug!("Invoking Bedrock agent {} (session {})", self.agent_id, session_id);
        let output = self
            .client
            .invoke_agent()
            .agent_id(&self.agent_id)
            .agent_alias_id(&self.agent_alias_id)
            .session_id(session_id)
            .input_text(input_text)
            .send()
            .await
            .map_err(invoke_error)?;

        let mut stream = output.completion;
        let mut completion = String::new();
        while let Some(event) = stream.recv().await.map_err(stream_error)? {
            if let Some(text) = chunk_text(&event) {
                completion.push_str(&text);
            }
        }
        Ok(finish_completion(completion))
    }
}

/// Text carried by one completion event; `None` for traces and the like.
pub fn chunk_text(event: &ResponseStream) -> Option<String> {
    match event {
        ResponseStream::Chunk(part) => part
            .bytes()
            .map(|blob| String::from_utf8_lossy(blob.as_ref()).into_owned()),
        _ => None,
    }
}

pub fn finish_completion(completion: String) -> String {
    if completion.is_empty() {
        EMPTY_COMPLETION.to_string()
    } else {
        completion
    }
}

fn invoke_error<R: Debug>(err: SdkError<InvokeAgentError, R>) -> LLMError {
    match err.as_service_error() {
        Some(e) if e.is_access_denied_exception() => LLMError::AuthenticationFailed,
        Some(e) if e.is_throttling_exception() => LLMError::RateLimit,
        Some(e) => LLMError::AgentException {
            kind: e.code().unwrap_or("UnknownException").to_string(),
            message: e.message().unwrap_or_default().to_string(),
        },
        None => LLMError::Provider(DisplayErrorContext(&err).to_string()),
    }
}

fn stream_error<R: Debug>(err: SdkError<ResponseStreamError, R>) -> LLMError {
    match err.as_service_error() {
        Some(e) if e.is_throttling_exception() => LLMError::RateLimit,
        Some(e) => LLMError::AgentException {
            kind: e.code().unwrap_or("UnknownException").to_string(),
            message: e.message().unwrap_or_default().to_string(),
        },
        None => LLMError::EventStream(DisplayErrorContext(&err).to_string()),
    }
}
