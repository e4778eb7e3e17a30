// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-call session driver.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use dialflow_config::model::ProviderConfig;
use dialflow_core::types::{ProviderFaultKind, SessionEvent, SessionRequest};
use dialflow_core::{CallOutcome, DialflowError, VoiceProvider};

/// Who holds the floor in a connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Floor {
    Listening,
    Speaking,
}

/// Lifecycle state of one driven session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected(Floor),
    Ended,
    Error,
}

/// Timeout knobs for the driver, taken from `[provider]` config.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Bound on time-to-connect: if no `Connected` event arrives within
    /// this window the call resolves to no-answer.
    pub handshake_timeout: Duration,
    /// Bound on a graceful stop; on expiry the session is force-marked
    /// ended locally.
    pub stop_timeout: Duration,
}

impl DriverConfig {
    pub fn from_provider_config(config: &ProviderConfig) -> Self {
        Self {
            handshake_timeout: Duration::from_secs(config.handshake_timeout_secs),
            stop_timeout: Duration::from_secs(config.stop_timeout_secs),
        }
    }
}

/// How one driven call resolved. Workers map this onto a terminal
/// call-result status.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// The session ended normally.
    Completed {
        /// True when the remote party held the floor at least once.
        /// A connected session where nobody ever spoke back is treated
        /// as voicemail by the worker.
        substantive: bool,
        duration_seconds: Option<u32>,
        outcome: Option<CallOutcome>,
        recording_url: Option<String>,
    },
    /// Line busy.
    Busy,
    /// Nobody picked up, or the provider could not be reached in time.
    NoAnswer,
    /// Provider fault or transport failure.
    Failed { message: String },
}

/// Drives one voice session from open to terminal outcome.
pub struct SessionDriver {
    provider: Arc<dyn VoiceProvider>,
    config: DriverConfig,
    state: Mutex<SessionState>,
}

impl SessionDriver {
    pub fn new(provider: Arc<dyn VoiceProvider>, config: DriverConfig) -> Self {
        Self {
            provider,
            config,
            state: Mutex::new(SessionState::Idle),
        }
    }

    /// Current lifecycle state. Exposed for the stop path and tests.
    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("state lock poisoned")
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().expect("state lock poisoned") = state;
    }

    /// Drive the session to completion.
    ///
    /// Never returns an error: every failure mode resolves to a
    /// [`SessionOutcome`] so that per-call trouble stays data, not
    /// control flow.
    pub async fn run(&self, request: SessionRequest) -> SessionOutcome {
        let session_id = request.session_id.clone();
        self.set_state(SessionState::Connecting);

        let mut stream = match self.provider.open_session(request).await {
            Ok(stream) => stream,
            Err(DialflowError::ProviderUnavailable { timeout }) => {
                warn!(%session_id, ?timeout, "provider unreachable, treating as no answer");
                self.set_state(SessionState::Error);
                return SessionOutcome::NoAnswer;
            }
            Err(e) => {
                warn!(%session_id, error = %e, "failed to open session");
                self.set_state(SessionState::Error);
                return SessionOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        // The handshake clock runs from open until the Connected event.
        let handshake_deadline = Instant::now() + self.config.handshake_timeout;
        let mut connected_at: Option<Instant> = None;
        let mut heard_customer = false;

        loop {
            let next = if connected_at.is_none() {
                match timeout_at(handshake_deadline, stream.next()).await {
                    Ok(ev) => ev,
                    Err(_) => {
                        debug!(%session_id, "handshake timed out");
                        self.set_state(SessionState::Error);
                        return SessionOutcome::NoAnswer;
                    }
                }
            } else {
                stream.next().await
            };

            match next {
                Some(Ok(SessionEvent::Connected { conversation_id })) => {
                    debug!(%session_id, %conversation_id, "session connected");
                    connected_at = Some(Instant::now());
                    self.set_state(SessionState::Connected(Floor::Speaking));
                }
                Some(Ok(SessionEvent::Listening)) => {
                    heard_customer = true;
                    self.set_state(SessionState::Connected(Floor::Listening));
                }
                Some(Ok(SessionEvent::Speaking)) => {
                    self.set_state(SessionState::Connected(Floor::Speaking));
                }
                Some(Ok(SessionEvent::Ended {
                    reason,
                    outcome,
                    recording_url,
                })) => {
                    debug!(%session_id, %reason, "session ended");
                    self.set_state(SessionState::Ended);
                    let duration_seconds =
                        connected_at.map(|t| t.elapsed().as_secs() as u32);
                    return SessionOutcome::Completed {
                        substantive: heard_customer,
                        duration_seconds,
                        outcome,
                        recording_url,
                    };
                }
                Some(Ok(SessionEvent::Fault { kind, message })) => {
                    warn!(%session_id, %kind, %message, "session fault");
                    self.set_state(SessionState::Error);
                    return match kind {
                        ProviderFaultKind::Busy => SessionOutcome::Busy,
                        ProviderFaultKind::Unavailable => SessionOutcome::NoAnswer,
                        ProviderFaultKind::Rejected | ProviderFaultKind::Other => {
                            SessionOutcome::Failed { message }
                        }
                    };
                }
                Some(Err(e)) => {
                    warn!(%session_id, error = %e, "event stream error");
                    self.set_state(SessionState::Error);
                    return SessionOutcome::Failed {
                        message: e.to_string(),
                    };
                }
                None => {
                    warn!(%session_id, "event stream ended without a terminal event");
                    self.set_state(SessionState::Error);
                    return SessionOutcome::Failed {
                        message: "event stream closed before session ended".to_string(),
                    };
                }
            }
        }
    }

    /// Request a graceful stop of the session.
    ///
    /// A no-op on sessions that already reached a terminal state. When the
    /// provider does not confirm within the stop timeout the session is
    /// force-marked ended locally so shutdown can always make progress.
    pub async fn stop(&self, session_id: &str) {
        if matches!(self.state(), SessionState::Ended | SessionState::Error) {
            return;
        }

        match timeout(
            self.config.stop_timeout,
            self.provider.stop_session(session_id),
        )
        .await
        {
            Ok(Ok(())) => debug!(%session_id, "session stopped"),
            Ok(Err(e)) => warn!(%session_id, error = %e, "stop request failed"),
            Err(_) => warn!(%session_id, "stop timed out, force-marking ended"),
        }
        self.set_state(SessionState::Ended);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dialflow_core::types::{
        AdapterType, AgentType, EndReason, HealthStatus, SessionEventStream,
    };
    use dialflow_core::PluginAdapter;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Plays back a fixed event script, optionally stalling forever first.
    struct ScriptedProvider {
        events: Vec<Result<SessionEvent, DialflowError>>,
        stall: bool,
        open_error: Option<fn() -> DialflowError>,
        stop_hangs: bool,
        stopped: AtomicBool,
    }

    impl ScriptedProvider {
        fn events(events: Vec<Result<SessionEvent, DialflowError>>) -> Self {
            Self {
                events,
                stall: false,
                open_error: None,
                stop_hangs: false,
                stopped: AtomicBool::new(false),
            }
        }

        fn stalling() -> Self {
            Self {
                events: Vec::new(),
                stall: true,
                open_error: None,
                stop_hangs: false,
                stopped: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl PluginAdapter for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Voice
        }
        async fn health_check(&self) -> Result<HealthStatus, DialflowError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), DialflowError> {
            Ok(())
        }
    }

    #[async_trait]
    impl VoiceProvider for ScriptedProvider {
        async fn open_session(
            &self,
            _request: SessionRequest,
        ) -> Result<SessionEventStream, DialflowError> {
            if let Some(make_error) = self.open_error {
                return Err(make_error());
            }
            if self.stall {
                return Ok(Box::pin(futures::stream::pending()));
            }
            let events: Vec<_> = self
                .events
                .iter()
                .map(|e| match e {
                    Ok(ev) => Ok(ev.clone()),
                    Err(err) => Err(DialflowError::Internal(err.to_string())),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(events)))
        }

        async fn stop_session(&self, _session_id: &str) -> Result<(), DialflowError> {
            if self.stop_hangs {
                futures::future::pending::<()>().await;
            }
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
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

    fn config() -> DriverConfig {
        DriverConfig {
            handshake_timeout: Duration::from_millis(100),
            stop_timeout: Duration::from_millis(50),
        }
    }

    fn connected() -> SessionEvent {
        SessionEvent::Connected {
            conversation_id: "conv-1".to_string(),
        }
    }

    fn ended() -> SessionEvent {
        SessionEvent::Ended {
            reason: EndReason::RemoteHangup,
            outcome: Some(CallOutcome::Interested),
            recording_url: Some("https://recordings/1".to_string()),
        }
    }

    #[tokio::test]
    async fn engaged_call_completes_substantively() {
        let provider = Arc::new(ScriptedProvider::events(vec![
            Ok(connected()),
            Ok(SessionEvent::Speaking),
            Ok(SessionEvent::Listening),
            Ok(SessionEvent::Speaking),
            Ok(ended()),
        ]));
        let driver = SessionDriver::new(provider, config());

        let outcome = driver.run(request()).await;
        match outcome {
            SessionOutcome::Completed {
                substantive,
                outcome,
                recording_url,
                ..
            } => {
                assert!(substantive);
                assert_eq!(outcome, Some(CallOutcome::Interested));
                assert_eq!(recording_url.as_deref(), Some("https://recordings/1"));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(driver.state(), SessionState::Ended);
    }

    #[tokio::test]
    async fn silent_call_is_not_substantive() {
        let provider = Arc::new(ScriptedProvider::events(vec![
            Ok(connected()),
            Ok(SessionEvent::Speaking),
            Ok(SessionEvent::Ended {
                reason: EndReason::ScriptComplete,
                outcome: None,
                recording_url: None,
            }),
        ]));
        let driver = SessionDriver::new(provider, config());

        match driver.run(request()).await {
            SessionOutcome::Completed { substantive, .. } => assert!(!substantive),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handshake_timeout_resolves_to_no_answer() {
        let provider = Arc::new(ScriptedProvider::stalling());
        let driver = SessionDriver::new(provider, config());

        assert_eq!(driver.run(request()).await, SessionOutcome::NoAnswer);
        assert_eq!(driver.state(), SessionState::Error);
    }

    #[tokio::test]
    async fn busy_fault_resolves_to_busy() {
        let provider = Arc::new(ScriptedProvider::events(vec![Ok(SessionEvent::Fault {
            kind: ProviderFaultKind::Busy,
            message: "486 busy here".to_string(),
        })]));
        let driver = SessionDriver::new(provider, config());

        assert_eq!(driver.run(request()).await, SessionOutcome::Busy);
    }

    #[tokio::test]
    async fn rejected_fault_resolves_to_failed() {
        let provider = Arc::new(ScriptedProvider::events(vec![Ok(SessionEvent::Fault {
            kind: ProviderFaultKind::Rejected,
            message: "bad agent config".to_string(),
        })]));
        let driver = SessionDriver::new(provider, config());

        match driver.run(request()).await {
            SessionOutcome::Failed { message } => assert!(message.contains("bad agent config")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_resolves_to_no_answer() {
        let mut provider = ScriptedProvider::events(vec![]);
        provider.open_error = Some(|| DialflowError::ProviderUnavailable {
            timeout: Duration::from_secs(30),
        });
        let driver = SessionDriver::new(Arc::new(provider), config());

        assert_eq!(driver.run(request()).await, SessionOutcome::NoAnswer);
    }

    #[tokio::test]
    async fn stream_closing_early_resolves_to_failed() {
        let provider = Arc::new(ScriptedProvider::events(vec![Ok(connected())]));
        let driver = SessionDriver::new(provider, config());

        match driver.run(request()).await {
            SessionOutcome::Failed { message } => {
                assert!(message.contains("closed before session ended"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_is_noop_after_terminal_state() {
        let provider = Arc::new(ScriptedProvider::events(vec![Ok(connected()), Ok(ended())]));
        let driver = SessionDriver::new(provider.clone(), config());
        driver.run(request()).await;

        driver.stop("sess-1").await;
        assert!(
            !provider.stopped.load(Ordering::SeqCst),
            "stop after Ended must not hit the provider"
        );
    }

    #[tokio::test]
    async fn stop_timeout_force_marks_ended() {
        let mut provider = ScriptedProvider::stalling();
        provider.stop_hangs = true;
        let provider = Arc::new(provider);
        let driver = SessionDriver::new(provider, config());
        // Driver never ran; state is Idle, so stop goes to the provider.

        let before = std::time::Instant::now();
        driver.stop("sess-1").await;
        assert!(before.elapsed() < Duration::from_secs(2));
        assert_eq!(driver.state(), SessionState::Ended);
    }
}
