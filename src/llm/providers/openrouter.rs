//! OpenRouter provider: the resilient call layer.
//!
//! One logical chat-completion request maps to at most
//! [`RetryPolicy::max_attempts`] HTTP exchanges. Only 429 and 5xx statuses are
//! retried; transport errors and other statuses fail on the spot.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::llm::retry::{is_retryable_status, parse_retry_after, sleep_or_cancel, RetryPolicy};
use crate::llm::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};

/// Default OpenRouter API endpoint.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// OpenRouter provider for LLM requests.
pub struct OpenRouterProvider {
    /// HTTP client for making API requests.
    client: Client,
    /// API key for OpenRouter authentication.
    api_key: String,
    /// Base URL for the OpenRouter API.
    base_url: String,
    /// Retry budget and backoff schedule.
    retry: RetryPolicy,
}

/// Outcome of a single HTTP exchange that did not fail outright.
enum AttemptOutcome {
    Success(GenerationResponse),
    Retryable {
        code: u16,
        body: String,
        retry_after: Option<Duration>,
    },
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider with the given API key.
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Self::with_custom_url(api_key, OPENROUTER_BASE_URL.to_string())
    }

    /// Create a provider against a custom base URL.
    ///
    /// Useful for testing or for OpenRouter-compatible proxies.
    pub fn with_custom_url(api_key: String, base_url: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the model catalogue. Single attempt, no retry.
    pub async fn list_models(&self, cancel: &CancellationToken) -> Result<Vec<ModelInfo>, LlmError> {
        let url = format!("{}/models", self.base_url);

        let exchange = async {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .header("Content-Type", "application/json")
                .send()
                .await
                .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

            if !status.is_success() {
                return Err(LlmError::ApiError {
                    code: status.as_u16(),
                    message: body,
                });
            }

            let models: ModelsResponse = serde_json::from_str(&body)
                .map_err(|e| LlmError::ParseError(format!("Failed to parse model list: {}", e)))?;
            Ok(models.data)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LlmError::Cancelled),
            result = exchange => result,
        }
    }

    /// Execute a request with exponential backoff retry logic.
    async fn execute_with_retry(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let max_attempts = self.retry.max_attempts();
        let mut last_failure: Option<(u16, String)> = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt - 1);
                tracing::debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    model = %request.model,
                    "Retrying OpenRouter request after transient failure"
                );
                sleep_or_cancel(delay, cancel).await?;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                outcome = self.execute_request(&url, request) => outcome?,
            };

            match outcome {
                AttemptOutcome::Success(response) => return Ok(response),
                AttemptOutcome::Retryable {
                    code,
                    body,
                    retry_after,
                } => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = max_attempts,
                        status = code,
                        model = %request.model,
                        "Transient error, will retry"
                    );

                    let has_next_attempt = attempt + 1 < max_attempts;
                    if let Some(hint) = retry_after {
                        if has_next_attempt && !self.retry.is_disabled() {
                            tracing::debug!(
                                retry_after_secs = hint.as_secs(),
                                "Honouring Retry-After hint"
                            );
                            sleep_or_cancel(hint, cancel).await?;
                        }
                    }
                    last_failure = Some((code, body));
                }
            }
        }

        let (code, message) = last_failure.unwrap_or_else(|| {
            (0, "Max retries exceeded with no error captured".to_string())
        });
        Err(LlmError::RetriesExhausted {
            attempts: max_attempts,
            code,
            message,
        })
    }

    /// Execute a single request (no retry logic).
    async fn execute_request(
        &self,
        url: &str,
        request: &ApiRequest,
    ) -> Result<AttemptOutcome, LlmError> {
        let http_response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .header("X-Title", "tenthman")
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let code = status.as_u16();
            let retry_after = if code == 429 {
                http_response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(parse_retry_after)
            } else {
                None
            };
            let body = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            if !is_retryable_status(code) {
                return Err(LlmError::ApiError {
                    code,
                    message: body,
                });
            }
            return Ok(AttemptOutcome::Retryable {
                code,
                body,
                retry_after,
            });
        }

        let body = http_response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;
        let api_response: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        Ok(AttemptOutcome::Success(api_response.into()))
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResponse, LlmError> {
        let api_request = ApiRequest {
            model: request.model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        self.execute_with_retry(&api_request, cancel).await
    }
}

/// A model entry from the OpenRouter catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pricing: Option<ModelPricing>,
}

/// Per-token pricing, as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub prompt: String,
    pub completion: String,
}

impl ModelPricing {
    /// Pricing of a free model.
    pub fn free() -> Self {
        Self {
            prompt: "0".to_string(),
            completion: "0".to_string(),
        }
    }

    /// True when both prompt and completion cost nothing.
    pub fn is_free(&self) -> bool {
        self.prompt == "0" && self.completion == "0"
    }
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

/// Internal request structure for the OpenRouter API.
#[derive(Debug, Clone, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Internal response structure from the OpenRouter API.
///
/// Everything but `choices` is optional on the wire; payload correctness is
/// the caller's concern.
#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    index: u32,
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default = "default_role")]
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

fn default_role() -> String {
    "assistant".to_string()
}

impl From<ApiResponse> for GenerationResponse {
    fn from(api_response: ApiResponse) -> Self {
        let choices = api_response
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                message: Message {
                    role: choice.message.role,
                    content: choice.message.content.unwrap_or_default(),
                },
                finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            })
            .collect();
        let usage = api_response.usage.unwrap_or_default();

        GenerationResponse {
            id: api_response.id,
            model: api_response.model,
            choices,
            usage: Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn provider_for(url: String, retry: RetryPolicy) -> OpenRouterProvider {
        OpenRouterProvider::with_custom_url("test-key".to_string(), url)
            .expect("client should build")
            .with_retry_policy(retry)
    }

    fn chat_request() -> GenerationRequest {
        GenerationRequest::new("test-model", vec![Message::user("hello")])
    }

    #[test]
    fn test_openrouter_provider_new() {
        let provider = OpenRouterProvider::new("test-api-key".to_string()).expect("client");

        assert_eq!(provider.base_url(), OPENROUTER_BASE_URL);
    }

    #[test]
    fn test_custom_url_trims_trailing_slash() {
        let provider = OpenRouterProvider::with_custom_url(
            "test-key".to_string(),
            "https://custom.api.com/v1/".to_string(),
        )
        .expect("client");
        assert_eq!(provider.base_url(), "https://custom.api.com/v1");
    }

    #[test]
    fn test_api_response_tolerates_missing_fields() {
        let body = r#"{"choices":[{"message":{"content":null}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(body).expect("lenient parse");
        let response: GenerationResponse = parsed.into();
        assert_eq!(response.first_content(), Some(""));
        assert_eq!(response.choices[0].message.role, "assistant");
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[test]
    fn test_model_pricing_is_free() {
        assert!(ModelPricing::free().is_free());
        let paid = ModelPricing {
            prompt: "0.000001".to_string(),
            completion: "0".to_string(),
        };
        assert!(!paid.is_free());
    }

    #[tokio::test]
    async fn test_generate_connection_error_is_not_retried() {
        let provider = provider_for("http://127.0.0.1:1".to_string(), RetryPolicy::default());

        let started = Instant::now();
        let result = provider
            .generate(chat_request(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(LlmError::RequestFailed(_))));
        // The default policy would sleep at least 1s before a retry.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_request_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "test-model",
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .with_status(200)
            .with_body(r#"{"id":"r1","model":"test-model","choices":[{"index":0,"message":{"role":"assistant","content":"hi there"},"finish_reason":"stop"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = provider_for(server.url(), RetryPolicy::immediate());
        let response = provider
            .generate(chat_request(), &CancellationToken::new())
            .await
            .expect("request should succeed");

        mock.assert_async().await;
        assert_eq!(response.first_content(), Some("hi there"));
    }

    #[tokio::test]
    async fn test_request_model_and_headers_sent_as_is() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("x-title", "tenthman")
            .match_header("http-referer", mockito::Matcher::Missing)
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"model": ""})))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = provider_for(server.url(), RetryPolicy::immediate());
        provider
            .generate(
                GenerationRequest::new("", vec![Message::user("hello")]),
                &CancellationToken::new(),
            )
            .await
            .expect("request should succeed");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retry_after_hint_is_honoured() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("retry-after", "1")
            .with_body("slow down")
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = provider_for(
            server.url(),
            RetryPolicy::with_backoff(|_| Duration::from_millis(1)),
        );

        let started = Instant::now();
        let response = provider
            .generate(chat_request(), &CancellationToken::new())
            .await
            .expect("should recover after the hint");

        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(response.first_content(), Some("ok"));
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_backoff() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("unavailable")
            .expect(1)
            .create_async()
            .await;

        let provider = provider_for(
            server.url(),
            RetryPolicy::with_backoff(|_| Duration::from_secs(30)),
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = provider.generate(chat_request(), &cancel).await;

        assert!(matches!(result, Err(LlmError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_already_cancelled_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let provider = provider_for(server.url(), RetryPolicy::immediate());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = provider.generate(chat_request(), &cancel).await;
        assert!(matches!(result, Err(LlmError::Cancelled)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_models() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/models")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(r#"{"data":[{"id":"model-1","name":"Model One","pricing":{"prompt":"0","completion":"0"}},{"id":"model-2","name":"Model Two","pricing":null}]}"#)
            .create_async()
            .await;

        let provider = provider_for(server.url(), RetryPolicy::immediate());
        let models = provider
            .list_models(&CancellationToken::new())
            .await
            .expect("model list");

        mock.assert_async().await;
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "model-1");
        assert!(models[1].pricing.is_none());
    }

    #[tokio::test]
    async fn test_list_models_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/models")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let provider = provider_for(server.url(), RetryPolicy::immediate());
        let err = provider
            .list_models(&CancellationToken::new())
            .await
            .expect_err("401 should fail");
        assert_eq!(err.status_code(), Some(401));
    }
}
