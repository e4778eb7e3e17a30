// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock voice provider for deterministic testing.
//!
//! `MockVoiceProvider` implements `VoiceProvider` with per-phone scripted
//! call behaviors. It instruments concurrency: a live-session counter with
//! a high-water mark lets tests assert the dispatcher's concurrency bound,
//! and every opened session is recorded in claim order.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use dialflow_core::types::{
    AdapterType, CallOutcome, EndReason, HealthStatus, ProviderFaultKind, SessionEvent,
    SessionEventStream, SessionRequest,
};
use dialflow_core::{DialflowError, PluginAdapter, VoiceProvider};

/// How the mock handles a call to one phone number.
#[derive(Debug, Clone)]
pub enum CallScript {
    /// Connect, exchange the floor, then hang up after `duration`.
    AnsweredEngaged {
        duration: Duration,
        outcome: Option<CallOutcome>,
    },
    /// Connect but the remote party never takes the floor (a machine).
    AnsweredSilent,
    /// Busy signal.
    Busy,
    /// Nothing ever happens; the caller's handshake timeout must fire.
    NoAnswer,
    /// Session fault with the given classification.
    Fault(ProviderFaultKind, String),
    /// `open_session` itself fails as provider-unreachable.
    Unreachable,
}

struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

struct StreamState {
    events: VecDeque<(Duration, SessionEvent)>,
    hang: bool,
    _guard: ActiveGuard,
}

/// A mock voice provider with scripted per-phone behavior.
///
/// Phones without a registered script get a zero-duration engaged answer.
pub struct MockVoiceProvider {
    scripts: Mutex<HashMap<String, CallScript>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    opened: Mutex<Vec<String>>,
    stopped: Mutex<Vec<String>>,
}

impl MockVoiceProvider {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            opened: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
        }
    }

    /// Register the behavior for calls to `phone`.
    pub fn script(&self, phone: &str, script: CallScript) {
        self.scripts
            .lock()
            .expect("scripts lock poisoned")
            .insert(phone.to_string(), script);
    }

    /// High-water mark of simultaneously live sessions.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Currently live sessions.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Customer ids in the order their sessions were opened.
    pub fn opened_customers(&self) -> Vec<String> {
        self.opened.lock().expect("opened lock poisoned").clone()
    }

    /// Session ids that received a stop request.
    pub fn stopped_sessions(&self) -> Vec<String> {
        self.stopped.lock().expect("stopped lock poisoned").clone()
    }

    fn script_for(&self, phone: &str) -> CallScript {
        self.scripts
            .lock()
            .expect("scripts lock poisoned")
            .get(phone)
            .cloned()
            .unwrap_or(CallScript::AnsweredEngaged {
                duration: Duration::ZERO,
                outcome: Some(CallOutcome::Interested),
            })
    }
}

impl Default for MockVoiceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockVoiceProvider {
    fn name(&self) -> &str {
        "mock-voice"
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
impl VoiceProvider for MockVoiceProvider {
    async fn open_session(
        &self,
        request: SessionRequest,
    ) -> Result<SessionEventStream, DialflowError> {
        let script = self.script_for(&request.customer_phone);

        if matches!(script, CallScript::Unreachable) {
            return Err(DialflowError::ProviderUnavailable {
                timeout: Duration::from_secs(30),
            });
        }

        self.opened
            .lock()
            .expect("opened lock poisoned")
            .push(request.customer_id.clone());

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let guard = ActiveGuard {
            active: self.active.clone(),
        };

        let connected = SessionEvent::Connected {
            conversation_id: format!("conv-{}", request.session_id),
        };
        let (events, hang): (Vec<(Duration, SessionEvent)>, bool) = match script {
            CallScript::AnsweredEngaged { duration, outcome } => (
                vec![
                    (Duration::ZERO, connected),
                    (Duration::ZERO, SessionEvent::Speaking),
                    (Duration::ZERO, SessionEvent::Listening),
                    (
                        duration,
                        SessionEvent::Ended {
                            reason: EndReason::RemoteHangup,
                            outcome,
                            recording_url: None,
                        },
                    ),
                ],
                false,
            ),
            CallScript::AnsweredSilent => (
                vec![
                    (Duration::ZERO, connected),
                    (Duration::ZERO, SessionEvent::Speaking),
                    (
                        Duration::ZERO,
                        SessionEvent::Ended {
                            reason: EndReason::ScriptComplete,
                            outcome: None,
                            recording_url: None,
                        },
                    ),
                ],
                false,
            ),
            CallScript::Busy => (
                vec![(
                    Duration::ZERO,
                    SessionEvent::Fault {
                        kind: ProviderFaultKind::Busy,
                        message: "busy".to_string(),
                    },
                )],
                false,
            ),
            CallScript::NoAnswer => (Vec::new(), true),
            CallScript::Fault(kind, message) => (
                vec![(Duration::ZERO, SessionEvent::Fault { kind, message })],
                false,
            ),
            CallScript::Unreachable => unreachable!("handled above"),
        };

        let state = StreamState {
            events: events.into(),
            hang,
            _guard: guard,
        };
        let stream = futures::stream::unfold(state, |mut state| async move {
            match state.events.pop_front() {
                Some((pause, event)) => {
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                    Some((Ok(event), state))
                }
                None if state.hang => {
                    // Never yields; the guard in `state` drops with the stream.
                    futures::future::pending::<()>().await;
                    None
                }
                None => None,
            }
        });
        Ok(Box::pin(stream))
    }

    async fn stop_session(&self, session_id: &str) -> Result<(), DialflowError> {
        self.stopped
            .lock()
            .expect("stopped lock poisoned")
            .push(session_id.to_string());
        Ok(())
    }
}
