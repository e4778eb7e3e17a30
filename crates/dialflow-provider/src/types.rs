// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the conversational-voice provider API.

use serde::{Deserialize, Serialize};

use dialflow_core::types::SessionEvent;

/// Body of `POST /v1/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub session_id: String,
    pub agent_type: String,
    pub phone_number: String,
    pub script: String,
    pub use_knowledge_base: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Response of `POST /v1/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub conversation_id: String,
}

/// One page of the long-polled event feed.
///
/// `events` reuses the engine's tagged [`SessionEvent`] encoding; an empty
/// page means the poll timed out server-side and the cursor is unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBatch {
    pub events: Vec<SessionEvent>,
    pub next_cursor: u64,
}

/// Error envelope returned by the provider API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}
