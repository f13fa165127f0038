use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, RequestBuilder, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::time::Duration;
use url::Url;

use super::ChatClient;
use crate::llm::{ GenerationParams, LlmConfig, LlmError };
use crate::models::chat::ChatMessage;

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Serialize, Debug)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_completion_tokens: u32,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChatCompletionMessage {
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, trimmed. Blank completions count as missing.
    pub fn into_text(self) -> Result<String, LlmError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

pub(crate) fn build_http_client(headers: HeaderMap, timeout: Duration) -> Result<HttpClient, LlmError> {
    HttpClient::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, LlmError> {
    let trimmed = raw.trim().trim_end_matches('/');
    Url::parse(trimmed).map_err(|e| LlmError::InvalidConfig(format!("Invalid endpoint '{}': {}", raw, e)))
}

/// Sends a prepared chat completion request and maps transport failures onto `LlmError`.
pub(crate) async fn send_completion(
    request: RequestBuilder,
    timeout: Duration
) -> Result<String, LlmError> {
    let resp = request.send().await.map_err(|e| map_transport_error(e, timeout))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(LlmError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    let parsed = resp
        .json::<ChatCompletionResponse>().await
        .map_err(|e| map_transport_error(e, timeout))?;
    parsed.into_text()
}

fn map_transport_error(e: reqwest::Error, timeout: Duration) -> LlmError {
    if e.is_timeout() { LlmError::Timeout(timeout) } else { LlmError::Request(e) }
}

/// Client for any OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    url: Url,
    params: GenerationParams,
    timeout: Duration,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: &str,
        model: String,
        base_url: &str,
        params: GenerationParams,
        timeout: Duration
    ) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                LlmError::InvalidConfig(format!("Invalid API key format: {}", e))
            )?
        );

        let base = parse_base_url(base_url)?;
        let url = if base.path().ends_with("/chat/completions") {
            base
        } else {
            Url::parse(&format!("{}/v1/chat/completions", base.as_str().trim_end_matches('/'))).map_err(
                |e| LlmError::InvalidConfig(format!("Invalid endpoint '{}': {}", base_url, e))
            )?
        };

        Ok(Self {
            http: build_http_client(headers, timeout)?,
            model,
            url,
            params,
            timeout,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .as_deref()
            .ok_or_else(|| LlmError::InvalidConfig("OpenAI API key is required".to_string()))?;
        let base_url = config.base_url.as_deref().unwrap_or("https://api.openai.com");

        Self::new(api_key, config.deployment.clone(), base_url, config.params, config.timeout)
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let req = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.params.temperature,
            max_completion_tokens: self.params.max_completion_tokens,
        };
        debug!("POST {} ({} messages)", self.url, messages.len());
        send_completion(self.http.post(self.url.clone()).json(&req), self.timeout).await
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_choice_is_trimmed() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  proposta final \n" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        })).unwrap();
        assert_eq!(resp.into_text().unwrap(), "proposta final");
    }

    #[test]
    fn missing_or_blank_content_is_empty_response() {
        for body in [
            json!({ "choices": [] }),
            json!({}),
            json!({ "choices": [{ "message": { "content": null } }] }),
            json!({ "choices": [{ "message": { "content": "   " } }] }),
        ] {
            let resp: ChatCompletionResponse = serde_json::from_value(body).unwrap();
            assert!(matches!(resp.into_text(), Err(LlmError::EmptyResponse)));
        }
    }

    #[test]
    fn request_body_carries_generation_params() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("Problema: x")];
        let req = ChatCompletionRequest {
            model: "gpt-4.1",
            messages: &messages,
            temperature: 0.2,
            max_completion_tokens: 900,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["model"], "gpt-4.1");
        assert_eq!(value["max_completion_tokens"], 900);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Problema: x");
        assert!((value["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn base_url_gets_completions_path() {
        let client = OpenAIChatClient::new(
            "sk",
            "gpt-4.1".into(),
            "http://localhost:8080/",
            GenerationParams::default(),
            Duration::from_secs(5)
        ).unwrap();
        assert_eq!(client.get_base_url().as_deref(), Some("http://localhost:8080/v1/chat/completions"));

        let client = OpenAIChatClient::new(
            "sk",
            "gpt-4.1".into(),
            "http://localhost:8080/v1/chat/completions",
            GenerationParams::default(),
            Duration::from_secs(5)
        ).unwrap();
        assert_eq!(client.get_base_url().as_deref(), Some("http://localhost:8080/v1/chat/completions"));
    }
}
