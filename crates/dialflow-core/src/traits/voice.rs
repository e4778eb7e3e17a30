// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice provider adapter trait for external conversational-voice integrations.

use async_trait::async_trait;

use crate::error::DialflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{SessionEventStream, SessionRequest};

/// Adapter for the external real-time conversational-voice provider.
///
/// One open session corresponds to exactly one live call. `open_session`
/// is a single attempt: it either yields an event stream whose first
/// event resolves the handshake, or fails outright. Retry policy, if any,
/// belongs to the caller; the session driver adds none.
#[async_trait]
pub trait VoiceProvider: PluginAdapter {
    /// Requests a new session and returns its event stream.
    ///
    /// The stream yields [`crate::types::SessionEvent::Connected`] once the
    /// handshake completes, floor-change events while the call is live, and
    /// exactly one terminal event (`Ended` or `Fault`).
    async fn open_session(
        &self,
        request: SessionRequest,
    ) -> Result<SessionEventStream, DialflowError>;

    /// Requests graceful termination of a session.
    ///
    /// Safe to call multiple times and on sessions that already ended;
    /// the provider treats those as no-ops.
    async fn stop_session(&self, session_id: &str) -> Result<(), DialflowError>;
}
