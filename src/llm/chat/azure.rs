use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use std::time::Duration;
use url::Url;

use super::ChatClient;
use super::openai::{ build_http_client, parse_base_url, send_completion, ChatCompletionRequest };
use crate::llm::{ GenerationParams, LlmConfig, LlmError };
use crate::models::chat::ChatMessage;

const API_KEY_HEADER: &str = "api-key";

/// Azure OpenAI chat completions, addressed by deployment name.
pub struct AzureOpenAIChatClient {
    http: HttpClient,
    deployment: String,
    url: Url,
    params: GenerationParams,
    timeout: Duration,
}

/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}`
pub fn completions_url(endpoint: &str, deployment: &str, api_version: &str) -> Result<Url, LlmError> {
    let mut url = parse_base_url(endpoint)?;
    url.path_segments_mut()
        .map_err(|_| LlmError::InvalidConfig(format!("Endpoint '{}' cannot be a base URL", endpoint)))?
        .pop_if_empty()
        .extend(["openai", "deployments", deployment, "chat", "completions"]);
    url.query_pairs_mut().clear().append_pair("api-version", api_version);
    Ok(url)
}

impl AzureOpenAIChatClient {
    pub fn new(
        api_key: &str,
        endpoint: &str,
        deployment: String,
        api_version: &str,
        params: GenerationParams,
        timeout: Duration
    ) -> Result<Self, LlmError> {
        if deployment.trim().is_empty() {
            return Err(LlmError::InvalidConfig("Azure deployment name is required".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key).map_err(|e|
                LlmError::InvalidConfig(format!("Invalid API key format: {}", e))
            )?
        );

        let url = completions_url(endpoint, &deployment, api_version)?;

        Ok(Self {
            http: build_http_client(headers, timeout)?,
            deployment,
            url,
            params,
            timeout,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .as_deref()
            .ok_or_else(|| LlmError::InvalidConfig("Azure OpenAI API key is required".to_string()))?;
        let endpoint = config.base_url
            .as_deref()
            .ok_or_else(|| LlmError::InvalidConfig("Azure OpenAI endpoint is required".to_string()))?;

        Self::new(
            api_key,
            endpoint,
            config.deployment.clone(),
            &config.api_version,
            config.params,
            config.timeout
        )
    }
}

#[async_trait]
impl ChatClient for AzureOpenAIChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let req = ChatCompletionRequest {
            model: &self.deployment,
            messages,
            temperature: self.params.temperature,
            max_completion_tokens: self.params.max_completion_tokens,
        };
        debug!("Invoking Azure OpenAI deployment '{}'", self.deployment);
        send_completion(self.http.post(self.url.clone()).json(&req), self.timeout).await
    }

    fn get_model(&self) -> String {
        self.deployment.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_deployment_url() {
        let url = completions_url(
            "https://my-res.openai.azure.com/",
            "gpt-4.1",
            "2024-12-01-preview"
        ).unwrap();
        assert_eq!(
            url.as_str(),
            "https://my-res.openai.azure.com/openai/deployments/gpt-4.1/chat/completions?api-version=2024-12-01-preview"
        );
    }

    #[test]
    fn deployment_name_is_path_encoded() {
        let url = completions_url("https://my-res.openai.azure.com", "my model", "v1").unwrap();
        assert!(url.path().contains("/deployments/my%20model/"));
    }

    #[test]
    fn rejects_relative_endpoint() {
        assert!(matches!(
            completions_url("my-res.openai.azure.com", "gpt-4.1", "v1"),
            Err(LlmError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_blank_deployment() {
        let result = AzureOpenAIChatClient::new(
            "key",
            "https://my-res.openai.azure.com",
            " ".into(),
            "v1",
            GenerationParams::default(),
            Duration::from_secs(1)
        );
        assert!(result.is_err());
    }
}
