// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for campaign and call-result persistence.

use async_trait::async_trait;

use crate::error::DialflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CallResult, Campaign, CampaignStatus};

/// Adapter for the durable campaign/call-result store.
///
/// Implementations must serialize counter mutations per campaign (a single
/// writer or an equivalent transactional path) so concurrent workers never
/// lose updates.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the backend (opens connections, runs migrations).
    async fn initialize(&self) -> Result<(), DialflowError>;

    /// Flushes and closes the backend.
    async fn close(&self) -> Result<(), DialflowError>;

    // --- Campaign operations ---

    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), DialflowError>;

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, DialflowError>;

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, DialflowError>;

    /// Updates only the status column (pause/resume bookkeeping).
    async fn update_campaign_status(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> Result<(), DialflowError>;

    /// Transitions `queued -> running` and stamps `started_at`.
    async fn mark_campaign_started(&self, id: &str) -> Result<(), DialflowError>;

    /// Records the terminal campaign status and stamps `completed_at`.
    async fn mark_campaign_finished(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> Result<(), DialflowError>;

    // --- Call result operations ---

    /// Inserts a freshly claimed call result (normally `in_progress`).
    async fn create_call_result(&self, result: &CallResult) -> Result<(), DialflowError>;

    /// Applies a terminal status to an existing result and increments the
    /// owning campaign's counters in the same transaction. A result that is
    /// already terminal is left untouched (immutability guard).
    async fn complete_call_result(&self, result: &CallResult) -> Result<(), DialflowError>;

    /// Inserts a terminal `cancelled` result for a recipient that was never
    /// claimed by a worker, incrementing `completed_calls` in the same
    /// transaction.
    async fn insert_cancelled_result(&self, result: &CallResult) -> Result<(), DialflowError>;

    /// All results for a campaign, ordered by dispatch order.
    async fn list_call_results(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<CallResult>, DialflowError>;
}
