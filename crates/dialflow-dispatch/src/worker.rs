// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-call worker: renders the script, drives one voice session,
//! and persists the terminal result. A worker never returns an error;
//! every failure mode lands in the call result's status and
//! `error_message`.

use std::sync::Arc;

use tracing::{debug, error};

use dialflow_core::types::{AgentType, CallResult, CallStatus, Recipient, SessionRequest};
use dialflow_core::{StorageAdapter, VoiceProvider};
use dialflow_session::{DriverConfig, SessionDriver, SessionOutcome};

/// Per-campaign context shared by all of the campaign's workers.
pub(crate) struct CallContext {
    pub storage: Arc<dyn StorageAdapter>,
    pub provider: Arc<dyn VoiceProvider>,
    pub driver_config: DriverConfig,
    pub script_content: String,
    pub agent_type: AgentType,
    pub use_knowledge_base: bool,
    pub custom_system_prompt: Option<String>,
}

/// Drive one claimed recipient's call to a terminal, persisted result.
pub(crate) async fn run_call(ctx: CallContext, recipient: Recipient, mut claim: CallResult) {
    let rendered_script = dialflow_script::render(&ctx.script_content, &recipient);
    let request = SessionRequest {
        session_id: claim.id.clone(),
        agent_type: ctx.agent_type,
        customer_id: recipient.id.clone(),
        customer_phone: recipient.phone.clone(),
        rendered_script,
        use_knowledge_base: ctx.use_knowledge_base,
        custom_system_prompt: ctx.custom_system_prompt.clone(),
    };

    let driver = SessionDriver::new(ctx.provider.clone(), ctx.driver_config.clone());
    let session_outcome = driver.run(request).await;
    apply_outcome(&mut claim, session_outcome);

    debug!(
        call_id = %claim.id,
        customer_id = %recipient.id,
        status = %claim.status,
        "call finished"
    );
    if let Err(e) = ctx.storage.complete_call_result(&claim).await {
        error!(call_id = %claim.id, error = %e, "failed to persist call result");
    }
}

/// Map a session outcome onto the claim's terminal fields.
fn apply_outcome(claim: &mut CallResult, outcome: SessionOutcome) {
    match outcome {
        SessionOutcome::Completed {
            substantive,
            duration_seconds,
            outcome,
            recording_url,
        } => {
            // Connected but nobody ever spoke back: that is a machine.
            claim.status = if substantive {
                CallStatus::Success
            } else {
                CallStatus::Voicemail
            };
            claim.outcome = if substantive { outcome } else { None };
            claim.duration_seconds = duration_seconds;
            claim.recording_url = recording_url;
        }
        SessionOutcome::Busy => claim.status = CallStatus::Busy,
        SessionOutcome::NoAnswer => claim.status = CallStatus::NoAnswer,
        SessionOutcome::Failed { message } => {
            claim.status = CallStatus::Failed;
            claim.error_message = Some(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialflow_core::types::CallOutcome;

    fn claim() -> CallResult {
        CallResult {
            id: "r1".to_string(),
            campaign_id: "camp".to_string(),
            customer_id: "c1".to_string(),
            customer_name: "Dana".to_string(),
            customer_phone: "+15550100".to_string(),
            dispatch_order: 0,
            status: CallStatus::InProgress,
            outcome: None,
            duration_seconds: None,
            recording_url: None,
            error_message: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn substantive_completion_maps_to_success() {
        let mut c = claim();
        apply_outcome(
            &mut c,
            SessionOutcome::Completed {
                substantive: true,
                duration_seconds: Some(33),
                outcome: Some(CallOutcome::AppointmentBooked),
                recording_url: Some("https://rec/1".to_string()),
            },
        );
        assert_eq!(c.status, CallStatus::Success);
        assert_eq!(c.outcome, Some(CallOutcome::AppointmentBooked));
        assert_eq!(c.duration_seconds, Some(33));
    }

    #[test]
    fn silent_completion_maps_to_voicemail_without_outcome() {
        let mut c = claim();
        apply_outcome(
            &mut c,
            SessionOutcome::Completed {
                substantive: false,
                duration_seconds: Some(12),
                outcome: Some(CallOutcome::Interested),
                recording_url: None,
            },
        );
        assert_eq!(c.status, CallStatus::Voicemail);
        assert!(c.outcome.is_none());
        assert_eq!(c.duration_seconds, Some(12));
    }

    #[test]
    fn failure_keeps_the_message() {
        let mut c = claim();
        apply_outcome(
            &mut c,
            SessionOutcome::Failed {
                message: "transport reset".to_string(),
            },
        );
        assert_eq!(c.status, CallStatus::Failed);
        assert_eq!(c.error_message.as_deref(), Some("transport reset"));
    }

    #[test]
    fn busy_and_no_answer_map_directly() {
        let mut c = claim();
        apply_outcome(&mut c, SessionOutcome::Busy);
        assert_eq!(c.status, CallStatus::Busy);

        let mut c = claim();
        apply_outcome(&mut c, SessionOutcome::NoAnswer);
        assert_eq!(c.status, CallStatus::NoAnswer);
    }
}
