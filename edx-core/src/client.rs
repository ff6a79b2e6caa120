//! HTTP clients for the hosted text-generation services.

use crate::error::{EdxError, Result};
use crate::prompt::{narration_prompt, values_system_message, values_user_message};
use crate::service::{NarrationRequest, NarrationService, ValuesRequest, ValuesService, API_ERROR_PREFIX};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;

pub const MISTRAL_MODEL: &str = "mistral-saba-2502";
pub const GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed-backoff retry schedule for text-generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_tries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 3,
            backoff: Duration::from_millis(1000),
        }
    }
}

/// Run `op` until it succeeds or the policy is exhausted, returning the last error.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_tries = policy.max_tries.max(1);
    let mut last_error = None;
    for attempt in 1..=max_tries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("Attempt {}/{}: {} failed: {}", attempt, max_tries, label, e);
                last_error = Some(e);
            }
        }
        if attempt < max_tries {
            info!(
                "Sleeping for {} milliseconds before retry for {}",
                policy.backoff.as_millis(),
                label
            );
            tokio::time::sleep(policy.backoff).await;
        }
    }
    warn!("All attempts failed for {}", label);
    Err(last_error.unwrap_or_else(|| EdxError::ResponseParse(format!("{} was never attempted", label))))
}

async fn post_json(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(EdxError::BadStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<Value>().await?)
}

/// Mistral's OpenAI-compatible chat completions endpoint.
pub struct MistralClient {
    client: Client,
    api_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl MistralClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn payload(request: &ValuesRequest) -> Value {
        json!({
            "model": MISTRAL_MODEL,
            "messages": [
                {
                    "role": "system",
                    "content": values_system_message(request.metrics.as_deref()),
                },
                {
                    "role": "user",
                    "content": values_user_message(&request.corpus, &request.query, &request.states),
                },
            ],
        })
    }
}

#[async_trait]
impl ValuesService for MistralClient {
    async fn values(&self, request: &ValuesRequest) -> String {
        let payload = Self::payload(request);
        let result = with_retry(&self.retry, "values request", || {
            post_json(
                self.client
                    .post(&self.api_url)
                    .bearer_auth(&self.api_key)
                    .json(&payload),
            )
        })
        .await;
        match result {
            Ok(body) => {
                debug!("Raw values response: {}", body);
                chat_content(&body)
            }
            Err(e) => format!("{} {}", API_ERROR_PREFIX, e),
        }
    }
}

/// First choice's message content, or "No response" when absent.
pub fn chat_content(body: &Value) -> String {
    body["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("No response")
        .to_string()
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            GEMINI_MODEL
        )
    }
}

#[async_trait]
impl NarrationService for GeminiClient {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String> {
        let prompt = narration_prompt(
            &request.corpus,
            &request.query,
            &request.states,
            &request.values_text,
        );
        let payload = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let endpoint = self.endpoint();
        let body = with_retry(&self.retry, "narration request", || {
            post_json(
                self.client
                    .post(&endpoint)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&payload),
            )
        })
        .await?;
        gemini_text(&body)
    }
}

/// Concatenated text parts of the first candidate.
pub fn gemini_text(body: &Value) -> Result<String> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| EdxError::ResponseParse("Error generating response".to_string()))?;
    let text: String = parts.iter().filter_map(|part| part["text"].as_str()).collect();
    if text.is_empty() {
        return Err(EdxError::ResponseParse("Error generating response".to_string()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;
    use crate::state::StateName;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn no_wait() -> RetryPolicy {
        RetryPolicy {
            max_tries: 3,
            backoff: Duration::from_millis(0),
        }
    }

    #[tokio::test]
    async fn test_retry_stops_on_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&no_wait(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 1 {
                    Err(EdxError::ResponseParse("flaky".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_three() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&no_wait(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EdxError::ResponseParse("down".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unreachable_values_service_degrades_to_api_error() {
        let client = MistralClient::new("http://127.0.0.1:9/v1/chat/completions", "key")
            .unwrap()
            .with_retry_policy(no_wait());
        let request = ValuesRequest {
            corpus: String::new(),
            query: "NDVI for Kerala".to_string(),
            states: vec![StateName::lookup("Kerala").unwrap()],
            metrics: Some(vec![Metric::Ndvi]),
        };
        let reply = client.values(&request).await;
        assert!(reply.starts_with(API_ERROR_PREFIX));
    }

    #[test]
    fn test_chat_content() {
        let body = json!({"choices": [{"message": {"content": "2023 Kerala\nNDVI: 0.4"}}]});
        assert_eq!(chat_content(&body), "2023 Kerala\nNDVI: 0.4");
        assert_eq!(chat_content(&json!({})), "No response");
    }

    #[test]
    fn test_payload_shape() {
        let request = ValuesRequest {
            corpus: "blob".to_string(),
            query: "NDVI for Goa".to_string(),
            states: vec![StateName::lookup("Goa").unwrap()],
            metrics: None,
        };
        let payload = MistralClient::payload(&request);
        assert_eq!(payload["model"], MISTRAL_MODEL);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert!(payload["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("Goa: 2024"));
    }

    #[test]
    fn test_gemini_text() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "Kerala "}, {"text": "is green."}]}}]});
        assert_eq!(gemini_text(&body).unwrap(), "Kerala is green.");
        assert!(gemini_text(&json!({"candidates": []})).is_err());
    }
}
