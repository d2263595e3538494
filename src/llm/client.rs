//! OpenAI-compatible chat completion client

use crate::config::LlmConfig;
use crate::error::{FindCandidateError, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single completion request
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a JSON object response
    pub json_mode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// Anything that can turn a prompt into a completion
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Chat completions client with retry on rate limits and server errors
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    retry_base_delay_ms: u64,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: String, model: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FindCandidateError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            max_retries: 3,
            retry_base_delay_ms: 1000,
        })
    }

    pub fn with_retries(mut self, max_retries: u32, retry_base_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay_ms = retry_base_delay_ms;
        self
    }

    /// Build a client from configuration, reading the API key from the environment
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = api_key_from_env(&config.api_key_env)?;
        Ok(Self::new(&config.base_url, api_key, &config.model, config.timeout_secs)?
            .with_retries(config.max_retries, config.retry_base_delay_ms))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(factor))
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat { format_type: "json_object" }),
        };

        let mut last_error: Option<FindCandidateError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(FindCandidateError::from(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(FindCandidateError::LlmApi {
                    status: status.as_u16(),
                    message: error_message(body),
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(FindCandidateError::LlmApi {
                    status: status.as_u16(),
                    message: error_message(body),
                });
            }

            let chat: ChatResponse = response.json().await?;
            let usage = chat.usage.unwrap_or_default();
            let text = chat
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| FindCandidateError::LlmInference("empty completion".to_string()))?;

            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );

            return Ok(LlmResponse { text, usage });
        }

        Err(last_error.unwrap_or_else(|| {
            FindCandidateError::LlmInference(format!("gave up after {} retries", self.max_retries))
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// `error.message` from an API error body, or the raw body
fn error_message(body: String) -> String {
    serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Read an API key from the named environment variable
pub fn api_key_from_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(FindCandidateError::Configuration(format!(
            "Environment variable {} is not set; export it or add it to .env, or run with --no-llm",
            var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn request() -> LlmRequest {
        LlmRequest {
            system: "You are a tester.".to_string(),
            prompt: "Say hi".to_string(),
            temperature: 0.2,
            max_tokens: 50,
            json_mode: true,
        }
    }

    fn client(url: &str, retries: u32) -> OpenAiClient {
        OpenAiClient::new(url, "test-key".to_string(), "gpt-4", 5)
            .unwrap()
            .with_retries(retries, 1)
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4",
                "response_format": {"type": "json_object"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{"message": {"role": "assistant", "content": "hi"}}],
                    "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let response = client(&server.url(), 0).complete(&request()).await.unwrap();

        assert_eq!(response.text, "hi");
        assert_eq!(response.usage.total_tokens, 11);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .expect(3)
            .create_async()
            .await;

        let err = client(&server.url(), 2).complete(&request()).await.unwrap_err();

        assert!(matches!(err, FindCandidateError::LlmApi { status: 503, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_until_success() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(json!({"error": {"message": "Rate limit reached"}}).to_string())
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"choices": [{"message": {"content": "after the wait"}}]}).to_string())
            .expect(1)
            .create_async()
            .await;

        let response = client(&server.url(), 2).complete(&request()).await.unwrap();

        assert_eq!(response.text, "after the wait");
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_fail_fast() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(json!({"error": {"message": "Incorrect API key provided"}}).to_string())
            .expect(1)
            .create_async()
            .await;

        let err = client(&server.url(), 3).complete(&request()).await.unwrap_err();

        match err {
            FindCandidateError::LlmApi { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_completion() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(json!({"choices": [{"message": {"content": ""}}]}).to_string())
            .create_async()
            .await;

        let err = client(&server.url(), 0).complete(&request()).await.unwrap_err();
        assert!(matches!(err, FindCandidateError::LlmInference(ref m) if m == "empty completion"));
    }

    #[test]
    fn test_retry_delay_doubles() {
        let client = OpenAiClient::new("http://localhost", "k".to_string(), "m", 1)
            .unwrap()
            .with_retries(3, 100);
        assert_eq!(client.retry_delay(1), Duration::from_millis(100));
        assert_eq!(client.retry_delay(2), Duration::from_millis(200));
        assert_eq!(client.retry_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn test_missing_api_key() {
        let err = api_key_from_env("FIND_CANDIDATE_TEST_UNSET_KEY").unwrap_err();
        assert!(err.to_string().contains("FIND_CANDIDATE_TEST_UNSET_KEY"));
    }
}
