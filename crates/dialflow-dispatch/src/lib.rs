// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded-concurrency campaign dispatcher.
//!
//! One spawned task per running campaign walks the recipient list in
//! order, claiming each recipient under a semaphore sized to the
//! campaign's concurrency limit (clamped to the recipient count). Claimed
//! recipients are handed to workers that drive one voice session each and
//! persist the terminal result. Pause stops new claims only; cancel also
//! marks every unclaimed recipient `cancelled` without ever touching the
//! voice provider for them.

pub mod worker;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use dialflow_core::types::{
    AgentType, CallResult, CallStatus, Campaign, CampaignStatus, Recipient,
};
use dialflow_core::{DialflowError, StorageAdapter, VoiceProvider};
use dialflow_session::DriverConfig;

/// Everything needed to launch a campaign, supplied wholesale at start.
#[derive(Debug, Clone)]
pub struct CampaignSpec {
    pub name: String,
    pub script_content: String,
    pub agent_type: AgentType,
    pub concurrency_limit: u32,
    pub use_knowledge_base: bool,
    pub custom_system_prompt: Option<String>,
    pub recipients: Vec<Recipient>,
}

/// Control signal observed by a campaign's dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CampaignControl {
    Running,
    Paused,
    Cancelled,
}

struct CampaignHandle {
    control: watch::Sender<CampaignControl>,
    task: JoinHandle<()>,
}

struct Inner {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn VoiceProvider>,
    driver_config: DriverConfig,
    active: Mutex<HashMap<String, CampaignHandle>>,
}

/// Launches and steers campaigns. Cheap to clone; all clones share the
/// same active-campaign registry.
#[derive(Clone)]
pub struct CampaignDispatcher {
    inner: Arc<Inner>,
}

impl CampaignDispatcher {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn VoiceProvider>,
        driver_config: DriverConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                provider,
                driver_config,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Validate a spec, persist the campaign, and spawn its dispatch task.
    ///
    /// Returns the stored campaign, already transitioned to `running`.
    pub async fn start_campaign(&self, spec: CampaignSpec) -> Result<Campaign, DialflowError> {
        validate_spec(&spec)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let campaign = Campaign {
            id: id.clone(),
            name: spec.name.clone(),
            script_content: spec.script_content.clone(),
            agent_type: spec.agent_type,
            concurrency_limit: spec.concurrency_limit,
            use_knowledge_base: spec.use_knowledge_base,
            custom_system_prompt: spec.custom_system_prompt.clone(),
            recipient_ids: spec.recipients.iter().map(|r| r.id.clone()).collect(),
            status: CampaignStatus::Queued,
            total_calls: spec.recipients.len() as u32,
            completed_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            created_at: now,
            started_at: None,
            completed_at: None,
        };

        self.inner.storage.create_campaign(&campaign).await?;
        self.inner.storage.mark_campaign_started(&id).await?;

        let (control_tx, control_rx) = watch::channel(CampaignControl::Running);
        let task = tokio::spawn(run_campaign(
            self.inner.clone(),
            campaign.clone(),
            spec.recipients,
            control_rx,
        ));
        self.inner
            .active
            .lock()
            .expect("active lock poisoned")
            .insert(
                id.clone(),
                CampaignHandle {
                    control: control_tx,
                    task,
                },
            );

        info!(campaign_id = %id, total_calls = campaign.total_calls, "campaign started");
        self.snapshot(&id).await
    }

    /// Stop claiming new recipients; in-flight calls run to completion.
    /// Idempotent, also on campaigns that already finished.
    pub async fn pause_campaign(&self, id: &str) -> Result<Campaign, DialflowError> {
        let changed = self.signal(id, |c| {
            if *c == CampaignControl::Running {
                *c = CampaignControl::Paused;
                true
            } else {
                false
            }
        })?;
        if changed {
            self.inner
                .storage
                .update_campaign_status(id, CampaignStatus::Paused)
                .await?;
            info!(campaign_id = %id, "campaign paused");
        }
        self.snapshot(id).await
    }

    /// Undo a pause. Idempotent.
    pub async fn resume_campaign(&self, id: &str) -> Result<Campaign, DialflowError> {
        let changed = self.signal(id, |c| {
            if *c == CampaignControl::Paused {
                *c = CampaignControl::Running;
                true
            } else {
                false
            }
        })?;
        if changed {
            self.inner
                .storage
                .update_campaign_status(id, CampaignStatus::Running)
                .await?;
            info!(campaign_id = %id, "campaign resumed");
        }
        self.snapshot(id).await
    }

    /// Stop claiming and mark every unclaimed recipient `cancelled`.
    /// In-flight calls still run to completion. Idempotent.
    ///
    /// The returned snapshot may still read `running` while workers drain;
    /// the campaign reaches `cancelled` once the dispatch task finalizes.
    pub async fn cancel_campaign(&self, id: &str) -> Result<Campaign, DialflowError> {
        let changed = self.signal(id, |c| {
            if *c == CampaignControl::Cancelled {
                false
            } else {
                *c = CampaignControl::Cancelled;
                true
            }
        })?;
        if changed {
            info!(campaign_id = %id, "campaign cancel requested");
        }
        self.snapshot(id).await
    }

    pub async fn get_campaign(&self, id: &str) -> Result<Campaign, DialflowError> {
        self.snapshot(id).await
    }

    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>, DialflowError> {
        self.inner.storage.list_campaigns().await
    }

    /// All call results for one campaign, in dispatch order.
    pub async fn list_results(&self, id: &str) -> Result<Vec<CallResult>, DialflowError> {
        // Surface unknown ids the same way the campaign reads do.
        self.snapshot(id).await?;
        self.inner.storage.list_call_results(id).await
    }

    /// Cancel every active campaign and wait for their dispatch tasks to
    /// drain. Used on agent shutdown.
    pub async fn shutdown(&self) {
        let handles: Vec<(String, CampaignHandle)> = {
            let mut active = self.inner.active.lock().expect("active lock poisoned");
            active.drain().collect()
        };
        for (id, handle) in &handles {
            debug!(campaign_id = %id, "cancelling for shutdown");
            let _ = handle.control.send(CampaignControl::Cancelled);
        }
        for (id, handle) in handles {
            if let Err(e) = handle.task.await {
                warn!(campaign_id = %id, error = %e, "dispatch task aborted");
            }
        }
    }

    /// Apply `f` to the campaign's control state under the registry lock.
    /// `Ok(false)` when the campaign has no active dispatch task.
    fn signal(
        &self,
        id: &str,
        f: impl FnOnce(&mut CampaignControl) -> bool,
    ) -> Result<bool, DialflowError> {
        let active = self.inner.active.lock().expect("active lock poisoned");
        match active.get(id) {
            Some(handle) => Ok(handle.control.send_if_modified(f)),
            None => Ok(false),
        }
    }

    async fn snapshot(&self, id: &str) -> Result<Campaign, DialflowError> {
        self.inner
            .storage
            .get_campaign(id)
            .await?
            .ok_or_else(|| DialflowError::CampaignNotFound(id.to_string()))
    }
}

fn validate_spec(spec: &CampaignSpec) -> Result<(), DialflowError> {
    if spec.name.trim().is_empty() {
        return Err(DialflowError::InvalidInput(
            "campaign name must not be empty".to_string(),
        ));
    }
    if spec.script_content.trim().is_empty() {
        return Err(DialflowError::InvalidInput(
            "script content must not be empty".to_string(),
        ));
    }
    if spec.recipients.is_empty() {
        return Err(DialflowError::InvalidInput(
            "recipient list must not be empty".to_string(),
        ));
    }
    if spec.concurrency_limit == 0 {
        return Err(DialflowError::InvalidInput(
            "concurrency limit must be at least 1".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for recipient in &spec.recipients {
        if recipient.id.trim().is_empty() || recipient.phone.trim().is_empty() {
            return Err(DialflowError::InvalidInput(format!(
                "recipient `{}` is missing an id or phone number",
                recipient.id
            )));
        }
        if !seen.insert(recipient.id.as_str()) {
            return Err(DialflowError::InvalidInput(format!(
                "duplicate recipient id `{}`",
                recipient.id
            )));
        }
    }
    Ok(())
}

/// The per-campaign dispatch loop.
///
/// Claims recipients strictly in list order, each claim gated on a
/// semaphore permit and the current control state. A storage failure while
/// claiming is fatal to the campaign; per-call trouble never is.
async fn run_campaign(
    inner: Arc<Inner>,
    campaign: Campaign,
    recipients: Vec<Recipient>,
    mut control_rx: watch::Receiver<CampaignControl>,
) {
    let campaign_id = campaign.id.clone();
    let permits = (campaign.concurrency_limit as usize).min(recipients.len());
    let semaphore = Arc::new(Semaphore::new(permits));
    let mut join_set: JoinSet<()> = JoinSet::new();
    let mut fatal = false;
    let mut claimed = 0usize;

    'recipients: while claimed < recipients.len() {
        // Wait out pauses and acquire a permit, re-checking control after
        // every wait so a pause or cancel issued mid-acquire wins.
        let permit = loop {
            let control = *control_rx.borrow_and_update();
            match control {
                CampaignControl::Cancelled => break 'recipients,
                CampaignControl::Paused => {
                    if control_rx.changed().await.is_err() {
                        break 'recipients;
                    }
                    continue;
                }
                CampaignControl::Running => {}
            }
            tokio::select! {
                permit = semaphore.clone().acquire_owned() => {
                    match permit {
                        Ok(permit) => break permit,
                        Err(_) => break 'recipients,
                    }
                }
                changed = control_rx.changed() => {
                    if changed.is_err() {
                        break 'recipients;
                    }
                }
            }
        };

        let recipient = recipients[claimed].clone();
        let order = claimed as i64;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let claim = CallResult {
            id: Uuid::new_v4().to_string(),
            campaign_id: campaign_id.clone(),
            customer_id: recipient.id.clone(),
            customer_name: recipient.name.clone(),
            customer_phone: recipient.phone.clone(),
            dispatch_order: order,
            status: CallStatus::InProgress,
            outcome: None,
            duration_seconds: None,
            recording_url: None,
            error_message: None,
            created_at: now.clone(),
            updated_at: now,
        };

        if let Err(e) = inner.storage.create_call_result(&claim).await {
            error!(campaign_id = %campaign_id, customer_id = %recipient.id, error = %e,
                "failed to claim recipient, failing campaign");
            fatal = true;
            break 'recipients;
        }
        claimed += 1;
        debug!(campaign_id = %campaign_id, customer_id = %recipient.id, order, "recipient claimed");

        let ctx = worker::CallContext {
            storage: inner.storage.clone(),
            provider: inner.provider.clone(),
            driver_config: inner.driver_config.clone(),
            script_content: campaign.script_content.clone(),
            agent_type: campaign.agent_type,
            use_knowledge_base: campaign.use_knowledge_base,
            custom_system_prompt: campaign.custom_system_prompt.clone(),
        };
        join_set.spawn(async move {
            worker::run_call(ctx, recipient, claim).await;
            drop(permit);
        });
    }

    // Let every in-flight call finish before finalizing.
    while join_set.join_next().await.is_some() {}

    // Sender gone means the dispatcher itself is being torn down.
    let cancelled = matches!(*control_rx.borrow(), CampaignControl::Cancelled)
        || control_rx.has_changed().is_err();

    let final_status = if fatal {
        CampaignStatus::Failed
    } else if claimed < recipients.len() || cancelled {
        // Mark everyone we never claimed, preserving dispatch order.
        for (order, recipient) in recipients.iter().enumerate().skip(claimed) {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            let result = CallResult {
                id: Uuid::new_v4().to_string(),
                campaign_id: campaign_id.clone(),
                customer_id: recipient.id.clone(),
                customer_name: recipient.name.clone(),
                customer_phone: recipient.phone.clone(),
                dispatch_order: order as i64,
                status: CallStatus::Cancelled,
                outcome: None,
                duration_seconds: None,
                recording_url: None,
                error_message: None,
                created_at: now.clone(),
                updated_at: now,
            };
            if let Err(e) = inner.storage.insert_cancelled_result(&result).await {
                error!(campaign_id = %campaign_id, customer_id = %recipient.id, error = %e,
                    "failed to record cancelled recipient");
            }
        }
        CampaignStatus::Cancelled
    } else {
        CampaignStatus::Completed
    };

    if let Err(e) = inner
        .storage
        .mark_campaign_finished(&campaign_id, final_status)
        .await
    {
        error!(campaign_id = %campaign_id, error = %e, "failed to finalize campaign");
    }
    info!(campaign_id = %campaign_id, status = %final_status, "campaign finished");

    inner
        .active
        .lock()
        .expect("active lock poisoned")
        .remove(&campaign_id);
}
