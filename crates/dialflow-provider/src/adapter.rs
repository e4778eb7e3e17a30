// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `VoiceProvider` implementation over the HTTP provider API.
//!
//! `open_session` creates the call server-side, then spawns a long-poll
//! task that feeds provider events into the returned stream. The poll task
//! stops at the first terminal event (`Ended` or `Fault`) or when the
//! consumer drops the stream.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use dialflow_config::model::ProviderConfig;
use dialflow_core::types::{
    AdapterType, HealthStatus, SessionEvent, SessionEventStream, SessionRequest,
};
use dialflow_core::{DialflowError, PluginAdapter, VoiceProvider};

use crate::client::VoiceClient;
use crate::types::CreateSessionRequest;

/// Voice provider adapter speaking the HTTP session API.
#[derive(Debug)]
pub struct HttpVoiceProvider {
    client: VoiceClient,
    /// session_id -> provider conversation_id, for the stop path.
    sessions: Arc<DashMap<String, String>>,
}

impl HttpVoiceProvider {
    /// Build the adapter from `[provider]` config. Requires an API key.
    pub fn new(config: &ProviderConfig) -> Result<Self, DialflowError> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            DialflowError::Config(
                "provider.api_key is required (set DIALFLOW_PROVIDER_API_KEY)".to_string(),
            )
        })?;
        Ok(Self {
            client: VoiceClient::new(config.base_url.clone(), api_key)?,
            sessions: Arc::new(DashMap::new()),
        })
    }

    #[cfg(test)]
    fn from_client(client: VoiceClient) -> Self {
        Self {
            client,
            sessions: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl PluginAdapter for HttpVoiceProvider {
    fn name(&self) -> &str {
        "http-voice"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Voice
    }

    async fn health_check(&self) -> Result<HealthStatus, DialflowError> {
        match self.client.health().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), DialflowError> {
        // Outstanding sessions are stopped by their drivers; nothing held here.
        self.sessions.clear();
        Ok(())
    }
}

#[async_trait]
impl VoiceProvider for HttpVoiceProvider {
    async fn open_session(
        &self,
        request: SessionRequest,
    ) -> Result<SessionEventStream, DialflowError> {
        let wire_request = CreateSessionRequest {
            session_id: request.session_id.clone(),
            agent_type: request.agent_type.to_string(),
            phone_number: request.customer_phone.clone(),
            script: request.rendered_script.clone(),
            use_knowledge_base: request.use_knowledge_base,
            system_prompt: request.custom_system_prompt.clone(),
        };
        let response = self.client.create_session(&wire_request).await?;
        let conversation_id = response.conversation_id;
        debug!(
            session_id = %request.session_id,
            conversation_id = %conversation_id,
            "provider session created"
        );
        self.sessions
            .insert(request.session_id.clone(), conversation_id.clone());

        let (tx, rx) = mpsc::channel::<Result<SessionEvent, DialflowError>>(32);
        let client = self.client.clone();
        let sessions = self.sessions.clone();
        let session_id = request.session_id;
        tokio::spawn(async move {
            let mut cursor = 0u64;
            'poll: loop {
                match client.poll_events(&conversation_id, cursor).await {
                    Ok(batch) => {
                        cursor = batch.next_cursor;
                        if batch.events.is_empty() {
                            // Pace re-polls when the server answers instantly
                            // instead of holding the long poll open.
                            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        }
                        for event in batch.events {
                            let terminal = matches!(
                                event,
                                SessionEvent::Ended { .. } | SessionEvent::Fault { .. }
                            );
                            if tx.send(Ok(event)).await.is_err() {
                                // Consumer dropped the stream.
                                break 'poll;
                            }
                            if terminal {
                                break 'poll;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(conversation_id = %conversation_id, error = %e, "event poll failed");
                        let _ = tx.send(Err(e)).await;
                        break 'poll;
                    }
                }
            }
            sessions.remove(&session_id);
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(Box::pin(stream))
    }

    async fn stop_session(&self, session_id: &str) -> Result<(), DialflowError> {
        let conversation_id = match self.sessions.get(session_id) {
            Some(entry) => entry.value().clone(),
            None => {
                // Already ended (or never opened); stopping is idempotent.
                debug!(session_id, "stop for unknown session, ignoring");
                return Ok(());
            }
        };
        self.client.stop_session(&conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialflow_core::types::AgentType;
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> HttpVoiceProvider {
        let client = VoiceClient::new("http://unused.example".into(), "vk-test")
            .unwrap()
            .with_base_url(base_url.to_string());
        HttpVoiceProvider::from_client(client)
    }

    fn request() -> SessionRequest {
        SessionRequest {
            session_id: "sess-1".to_string(),
            agent_type: AgentType::Sales,
            customer_id: "c1".to_string(),
            customer_phone: "+15550100".to_string(),
            rendered_script: "Hi Dana".to_string(),
            use_knowledge_base: false,
            custom_system_prompt: None,
        }
    }

    #[tokio::test]
    async fn open_session_streams_until_terminal_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"conversation_id": "conv-1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/sessions/conv-1/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "events": [
                    {"type": "connected", "conversation_id": "conv-1"},
                    {"type": "speaking"},
                    {"type": "listening"},
                    {"type": "ended", "reason": "remote_hangup",
                     "outcome": "interested", "recording_url": null}
                ],
                "next_cursor": 4
            })))
            .mount(&server)
            .await;

        let provider = provider(&server.uri());
        let stream = provider.open_session(request()).await.unwrap();
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[0].as_ref().unwrap(),
            SessionEvent::Connected { .. }
        ));
        assert!(matches!(
            events[3].as_ref().unwrap(),
            SessionEvent::Ended { .. }
        ));
    }

    #[tokio::test]
    async fn poll_failure_surfaces_as_stream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"conversation_id": "conv-2"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/sessions/conv-2/events"))
            .respond_with(ResponseTemplate::new(500).set_body_json(
                serde_json::json!({"error": {"code": "internal", "message": "boom"}}),
            ))
            .mount(&server)
            .await;

        let provider = provider(&server.uri());
        let stream = provider.open_session(request()).await.unwrap();
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_err());
    }

    #[tokio::test]
    async fn stop_session_uses_the_conversation_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"conversation_id": "conv-3"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/sessions/conv-3/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "events": [],
                "next_cursor": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/conv-3/stop"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server.uri());
        let _stream = provider.open_session(request()).await.unwrap();
        provider.stop_session("sess-1").await.unwrap();
    }

    #[tokio::test]
    async fn stop_unknown_session_is_a_noop() {
        let server = MockServer::start().await;
        let provider = provider(&server.uri());
        provider.stop_session("never-opened").await.unwrap();
    }

    #[tokio::test]
    async fn missing_api_key_is_a_config_error() {
        let config = ProviderConfig {
            api_key: None,
            ..ProviderConfig::default()
        };
        let err = HttpVoiceProvider::new(&config).unwrap_err();
        assert!(matches!(err, DialflowError::Config(_)));
    }
}
