// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types used across adapter traits and the Dialflow engine.

use std::collections::HashMap;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DialflowError;

/// Which conversational agent persona drives a call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Sales,
    Support,
}

/// Lifecycle status of a campaign.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Queued,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl CampaignStatus {
    /// Returns true for statuses from which no further transition occurs.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Lifecycle status of one recipient's call within a campaign.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Queued,
    InProgress,
    Success,
    Failed,
    Voicemail,
    NoAnswer,
    Busy,
    Cancelled,
}

impl CallStatus {
    /// Returns true for statuses from which no further transition occurs.
    /// A call result is immutable once terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Queued | Self::InProgress)
    }
}

/// Business classification of a successful call. Set only on `success` results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Interested,
    NotInterested,
    AppointmentBooked,
    CallbackRequested,
    DoNotCall,
}

/// A batch outreach job with a fixed recipient list and concurrency ceiling.
///
/// Counters are monotonically non-decreasing while `running`;
/// `completed_calls` counts every terminal outcome (success, failure,
/// voicemail, no-answer, busy, per-call cancellation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    /// Raw script template with `{variable}` placeholders.
    pub script_content: String,
    pub agent_type: AgentType,
    /// Maximum simultaneously active voice sessions; clamped to the
    /// recipient count at dispatch time.
    pub concurrency_limit: u32,
    pub use_knowledge_base: bool,
    pub custom_system_prompt: Option<String>,
    /// Customer identifiers in dispatch priority order (insertion order).
    pub recipient_ids: Vec<String>,
    pub status: CampaignStatus,
    /// Fixed at creation: `recipient_ids.len()`.
    pub total_calls: u32,
    pub completed_calls: u32,
    pub successful_calls: u32,
    pub failed_calls: u32,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// The record of one recipient's outreach attempt within a campaign.
///
/// Exactly one exists per (campaign, customer); created when the dispatcher
/// claims the recipient, immutable once its status is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    pub id: String,
    pub campaign_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    /// Position in the campaign's dispatch order; used to order `ListResults`.
    pub dispatch_order: i64,
    pub status: CallStatus,
    pub outcome: Option<CallOutcome>,
    pub duration_seconds: Option<u32>,
    pub recording_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One entry of the recipient list supplied wholesale at campaign start.
///
/// Attributes (neighborhood, price, ...) feed script rendering; the
/// dispatcher never re-fetches them mid-campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

// --- Voice session contract ---

/// Request to open one live conversation with the external voice provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Caller-chosen session identifier, scoped to exactly one call result.
    pub session_id: String,
    pub agent_type: AgentType,
    pub customer_id: String,
    pub customer_phone: String,
    /// Script after per-recipient variable substitution.
    pub rendered_script: String,
    pub use_knowledge_base: bool,
    pub custom_system_prompt: Option<String>,
}

/// Why a connected session ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    RemoteHangup,
    ScriptComplete,
    Stopped,
}

/// Classification of a provider-reported session fault.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProviderFaultKind {
    /// Line busy signal from the provider.
    Busy,
    /// Provider could not be reached or gave up before connecting.
    Unavailable,
    /// Auth rejection or malformed agent configuration.
    Rejected,
    /// Any other provider fault.
    Other,
}

/// One event on a voice session's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Handshake complete; the provider assigned a conversation id.
    Connected { conversation_id: String },
    /// The remote party holds the floor.
    Listening,
    /// The agent holds the floor.
    Speaking,
    /// Session closed (remote hangup, script completion, or explicit stop).
    Ended {
        reason: EndReason,
        /// Business classification detected by the provider, if any.
        outcome: Option<CallOutcome>,
        recording_url: Option<String>,
    },
    /// Unrecoverable session fault.
    Fault {
        kind: ProviderFaultKind,
        message: String,
    },
}

/// Stream of session events as produced by a [`crate::VoiceProvider`].
pub type SessionEventStream =
    Pin<Box<dyn futures_core::Stream<Item = Result<SessionEvent, DialflowError>> + Send>>;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the plugin registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Voice,
    Storage,
}
