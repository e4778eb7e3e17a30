// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the conversational-voice provider API.
//!
//! Provides [`VoiceClient`] which handles request construction, bearer
//! authentication, long-poll event fetching, and transient error retry.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use dialflow_core::DialflowError;

use crate::types::{ApiErrorResponse, CreateSessionRequest, CreateSessionResponse, EventBatch};

/// Upper bound on one long-poll round trip; the server is expected to
/// respond with an empty batch well before this.
const POLL_TIMEOUT: Duration = Duration::from_secs(35);

/// HTTP client for voice provider communication.
///
/// Manages the auth header, connection pooling, and retry logic for
/// transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct VoiceClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl VoiceClient {
    /// Creates a new provider API client.
    pub fn new(base_url: String, api_key: &str) -> Result<Self, DialflowError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {api_key}");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer).map_err(|e| {
                DialflowError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(POLL_TIMEOUT)
            .build()
            .map_err(|e| DialflowError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// `POST /v1/sessions`: ask the provider to place the call.
    ///
    /// On transient errors (429, 500, 503), retries once after a 1-second
    /// delay. Connection failures map to `ProviderUnavailable` so callers
    /// can resolve them as no-answer.
    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, DialflowError> {
        let url = format!("{}/v1/sessions", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying session create after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = match self.client.post(&url).json(request).send().await {
                Ok(response) => response,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    return Err(DialflowError::ProviderUnavailable {
                        timeout: POLL_TIMEOUT,
                    });
                }
                Err(e) => {
                    return Err(DialflowError::Provider {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, "session create response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| DialflowError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&body).map_err(|e| DialflowError::Provider {
                    message: format!("failed to parse session create response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(DialflowError::Provider {
                    message: format!("API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }

        Err(last_error.unwrap_or_else(|| DialflowError::Provider {
            message: "session create failed after retries".into(),
            source: None,
        }))
    }

    /// `GET /v1/sessions/{conversation_id}/events?cursor=N`: long-poll the
    /// next page of session events.
    pub async fn poll_events(
        &self,
        conversation_id: &str,
        cursor: u64,
    ) -> Result<EventBatch, DialflowError> {
        let url = format!(
            "{}/v1/sessions/{conversation_id}/events",
            self.base_url
        );
        let response = self
            .client
            .get(&url)
            .query(&[("cursor", cursor)])
            .send()
            .await
            .map_err(|e| DialflowError::Provider {
                message: format!("event poll failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }

        let body = response.text().await.map_err(|e| DialflowError::Provider {
            message: format!("failed to read event batch: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| DialflowError::Provider {
            message: format!("failed to parse event batch: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// `GET /v1/health`: cheap liveness probe of the provider API.
    pub async fn health(&self) -> Result<(), DialflowError> {
        let url = format!("{}/v1/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DialflowError::Provider {
                message: format!("health probe failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }
        Ok(())
    }

    /// `POST /v1/sessions/{conversation_id}/stop`: request a graceful stop.
    pub async fn stop_session(&self, conversation_id: &str) -> Result<(), DialflowError> {
        let url = format!("{}/v1/sessions/{conversation_id}/stop", self.base_url);
        let response =
            self.client
                .post(&url)
                .send()
                .await
                .map_err(|e| DialflowError::Provider {
                    message: format!("stop request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }
        Ok(())
    }
}

fn api_error(status: reqwest::StatusCode, body: String) -> DialflowError {
    let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
        format!(
            "provider API error ({}): {}",
            api_err.error.code, api_err.error.message
        )
    } else {
        format!("API returned {status}: {body}")
    };
    DialflowError::Provider {
        message,
        source: None,
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> VoiceClient {
        VoiceClient::new("http://unused.example".into(), "vk-test")
            .unwrap()
            .with_base_url(base_url.to_string())
    }

    fn test_request() -> CreateSessionRequest {
        CreateSessionRequest {
            session_id: "sess-1".into(),
            agent_type: "sales".into(),
            phone_number: "+15550100".into(),
            script: "Hi Dana".into(),
            use_knowledge_base: false,
            system_prompt: None,
        }
    }

    #[tokio::test]
    async fn create_session_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .and(header("authorization", "Bearer vk-test"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"conversation_id": "conv-1"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client.create_session(&test_request()).await.unwrap();
        assert_eq!(response.conversation_id, "conv-1");
    }

    #[tokio::test]
    async fn create_session_retries_on_429() {
        let server = MockServer::start().await;
        let error_body =
            serde_json::json!({"error": {"code": "rate_limited", "message": "slow down"}});

        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(&error_body))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"conversation_id": "conv-retry"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client.create_session(&test_request()).await.unwrap();
        assert_eq!(response.conversation_id, "conv-retry");
    }

    #[tokio::test]
    async fn create_session_fails_on_401() {
        let server = MockServer::start().await;
        let error_body =
            serde_json::json!({"error": {"code": "unauthorized", "message": "bad key"}});
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(&error_body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.create_session(&test_request()).await.unwrap_err();
        assert!(err.to_string().contains("unauthorized"), "got: {err}");
    }

    #[tokio::test]
    async fn create_session_maps_connect_failure_to_unavailable() {
        // Nothing listens on this port.
        let client = test_client("http://127.0.0.1:9");
        let err = client.create_session(&test_request()).await.unwrap_err();
        assert!(matches!(err, DialflowError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn poll_events_passes_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sessions/conv-1/events"))
            .and(query_param("cursor", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "events": [{"type": "listening"}],
                "next_cursor": 3
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let batch = client.poll_events("conv-1", 2).await.unwrap();
        assert_eq!(batch.next_cursor, 3);
        assert_eq!(batch.events.len(), 1);
    }

    #[tokio::test]
    async fn stop_session_posts_to_stop() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/conv-1/stop"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        client.stop_session("conv-1").await.unwrap();
    }
}
