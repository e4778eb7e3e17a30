// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A storage wrapper that starts refusing call-result claims after a
//! budget of successful ones. Everything else passes straight through,
//! so tests can drive a real database into the campaign-fatal path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use dialflow_core::types::{AdapterType, CallResult, Campaign, CampaignStatus, HealthStatus};
use dialflow_core::{DialflowError, PluginAdapter, StorageAdapter};

/// Wraps a working [`StorageAdapter`] and fails `create_call_result`
/// once `allow_claims` claims have gone through.
pub struct FailingStorage {
    inner: Arc<dyn StorageAdapter>,
    remaining_claims: AtomicUsize,
}

impl FailingStorage {
    pub fn new(inner: Arc<dyn StorageAdapter>, allow_claims: usize) -> Self {
        Self {
            inner,
            remaining_claims: AtomicUsize::new(allow_claims),
        }
    }

    fn claim_budget_left(&self) -> bool {
        self.remaining_claims
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PluginAdapter for FailingStorage {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, DialflowError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), DialflowError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl StorageAdapter for FailingStorage {
    async fn initialize(&self) -> Result<(), DialflowError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), DialflowError> {
        self.inner.close().await
    }

    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), DialflowError> {
        self.inner.create_campaign(campaign).await
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, DialflowError> {
        self.inner.get_campaign(id).await
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, DialflowError> {
        self.inner.list_campaigns().await
    }

    async fn update_campaign_status(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> Result<(), DialflowError> {
        self.inner.update_campaign_status(id, status).await
    }

    async fn mark_campaign_started(&self, id: &str) -> Result<(), DialflowError> {
        self.inner.mark_campaign_started(id).await
    }

    async fn mark_campaign_finished(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> Result<(), DialflowError> {
        self.inner.mark_campaign_finished(id, status).await
    }

    async fn create_call_result(&self, result: &CallResult) -> Result<(), DialflowError> {
        if !self.claim_budget_left() {
            return Err(DialflowError::Storage {
                source: Box::new(std::io::Error::other("database has gone away")),
            });
        }
        self.inner.create_call_result(result).await
    }

    async fn complete_call_result(&self, result: &CallResult) -> Result<(), DialflowError> {
        self.inner.complete_call_result(result).await
    }

    async fn insert_cancelled_result(&self, result: &CallResult) -> Result<(), DialflowError> {
        self.inner.insert_cancelled_result(result).await
    }

    async fn list_call_results(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<CallResult>, DialflowError> {
        self.inner.list_call_results(campaign_id).await
    }
}
