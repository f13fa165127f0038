pub mod azure;
pub mod openai;

use async_trait::async_trait;
use log::{ error, info };
use std::sync::Arc;

use super::{ LlmConfig, LlmError, LlmType };
use self::azure::AzureOpenAIChatClient;
use self::openai::OpenAIChatClient;
use crate::models::chat::ChatMessage;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends one chat completion request and returns the trimmed completion text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Azure => {
            let specific_client = AzureOpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

/// Process-wide chat client, or the reason it could not be built at startup.
///
/// A failed initialization does not stop the server; it is reported again on
/// every call so requests fail with a clear message.
#[derive(Clone)]
pub enum ClientHandle {
    Ready(Arc<dyn ChatClient>),
    Unavailable(String),
}

impl ClientHandle {
    pub fn from_config(config: &LlmConfig) -> Self {
        let missing = config.missing_settings();
        if !missing.is_empty() {
            for name in &missing {
                error!("{} is not configured!", name);
            }
            return ClientHandle::Unavailable(format!("missing {}", missing.join(", ")));
        }

        match new_client(config) {
            Ok(client) => {
                info!(
                    "Chat client configured: Type={}, Deployment={}, BaseURL={}",
                    config.llm_type,
                    client.get_model(),
                    client.get_base_url().as_deref().unwrap_or("adapter default")
                );
                ClientHandle::Ready(client)
            }
            Err(e) => {
                error!("Failed to initialize chat client: {}", e);
                ClientHandle::Unavailable(e.to_string())
            }
        }
    }

    pub fn get(&self) -> Result<&Arc<dyn ChatClient>, LlmError> {
        match self {
            ClientHandle::Ready(client) => Ok(client),
            ClientHandle::Unavailable(reason) => Err(LlmError::NotInitialized(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ClientHandle::Ready(_))
    }
}
