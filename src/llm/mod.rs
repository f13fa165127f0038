pub mod chat;
pub mod retry;

use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    Azure,
    OpenAI,
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmType::Azure => write!(f, "azure"),
            LlmType::OpenAI => write!(f, "openai"),
        }
    }
}

impl FromStr for LlmType {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "azure" | "azure-openai" => Ok(LlmType::Azure),
            "openai" => Ok(LlmType::OpenAI),
            _ => Err(LlmError::InvalidConfig(format!("Invalid LLM provider: '{}'", s))),
        }
    }
}

/// Failures of a single remote chat call. All of them are retried by the pipeline.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Chat client not initialized: {0}")]
    NotInitialized(String),

    #[error("Chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Chat request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Chat API returned {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },

    #[error("Chat API returned an empty completion")]
    EmptyResponse,

    #[error("Invalid chat client configuration: {0}")]
    InvalidConfig(String),
}

/// Sampling parameters shared by every call the pipeline makes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_completion_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_completion_tokens: 900,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub api_version: String,
    pub deployment: String,
    pub params: GenerationParams,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            llm_type: LlmType::Azure,
            api_key: None,
            base_url: None,
            api_version: "2024-12-01-preview".to_string(),
            deployment: "gpt-4.1".to_string(),
            params: GenerationParams::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl LlmConfig {
    /// Names the settings that are required but absent, in the order they are reported.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            missing.push("AZURE_OPENAI_API_KEY");
        }
        if self.base_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            missing.push("AZURE_OPENAI_ENDPOINT");
        }
        missing
    }
}
