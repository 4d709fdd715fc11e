use crate::agent::NavigationAgent;
use crate::bedrock::BedrockNavigationAgent;
use crate::local::LocalNavigationAgent;
use std::sync::Arc;
use tracing::info;
use wayfinder_core::Settings;

pub struct AgentFactory;

impl AgentFactory {
    /// Bedrock when it is switched on, configured and credentialed;
    /// otherwise the local agent.
    pub fn create(settings: &Settings) -> Arc<dyn NavigationAgent> {
        if Self::wants_bedrock(settings) {
            info!("Creating Bedrock navigation agent");
            Arc::new(Self::create_bedrock(settings))
        } else {
            info!("Creating local navigation agent");
            Arc::new(Self::create_local(settings))
        }
    }

    pub fn create_local(settings: &Settings) -> LocalNavigationAgent {
        LocalNavigationAgent::from_settings(settings)
    }

    pub fn create_bedrock(settings: &Settings) -> BedrockNavigationAgent {
        BedrockNavigationAgent::from_settings(settings)
    }

    pub fn available_agents(settings: &Settings) -> Vec<&'static str> {
        let mut available = vec!["LocalNavigationAgent"];
        if settings.has_aws_credentials() && settings.has_bedrock_agent() {
            available.push("BedrockNavigationAgent");
        }
        available
    }

    fn wants_bedrock(settings: &Settings) -> bool {
        settings.use_bedrock && settings.has_bedrock_agent() && settings.has_aws_credentials()
    }
}
