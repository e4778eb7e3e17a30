// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end dispatcher testing.
//!
//! `DispatchHarness` assembles a complete dispatcher stack: temp SQLite
//! database, mock voice provider, and a `CampaignDispatcher` wired with
//! short timeouts so timeout-path tests finish in milliseconds.

use std::sync::Arc;
use std::time::Duration;

use dialflow_config::model::StorageConfig;
use dialflow_core::types::{Campaign, Recipient};
use dialflow_core::{DialflowError, StorageAdapter};
use dialflow_dispatch::CampaignDispatcher;
use dialflow_session::DriverConfig;
use dialflow_storage::SqliteStorage;

use crate::failing_storage::FailingStorage;
use crate::mock_provider::MockVoiceProvider;

/// A full dispatcher stack over a temp database.
///
/// The temp directory lives as long as the harness; dropping the harness
/// deletes the database.
pub struct DispatchHarness {
    pub dispatcher: CampaignDispatcher,
    pub storage: Arc<dyn StorageAdapter>,
    pub provider: Arc<MockVoiceProvider>,
    _temp_dir: tempfile::TempDir,
}

impl DispatchHarness {
    /// Build a harness with a 200ms handshake timeout and 50ms stop timeout.
    pub async fn new() -> Result<Self, DialflowError> {
        Self::build(|storage| storage).await
    }

    /// Like [`DispatchHarness::new`], but the storage refuses new
    /// call-result claims once `allow` have succeeded. Reads, completions,
    /// and campaign bookkeeping keep working, so the campaign-fatal path
    /// can be driven against an otherwise healthy database.
    pub async fn with_failing_claims(allow: usize) -> Result<Self, DialflowError> {
        Self::build(move |storage| Arc::new(FailingStorage::new(storage, allow))).await
    }

    async fn build(
        wrap: impl FnOnce(Arc<dyn StorageAdapter>) -> Arc<dyn StorageAdapter>,
    ) -> Result<Self, DialflowError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| DialflowError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        let storage = wrap(Arc::new(storage));

        let provider = Arc::new(MockVoiceProvider::new());
        let driver_config = DriverConfig {
            handshake_timeout: Duration::from_millis(200),
            stop_timeout: Duration::from_millis(50),
        };
        let dispatcher =
            CampaignDispatcher::new(storage.clone(), provider.clone(), driver_config);

        Ok(Self {
            dispatcher,
            storage,
            provider,
            _temp_dir: temp_dir,
        })
    }

    /// Poll the campaign until it reaches a terminal status.
    ///
    /// Panics after `deadline` so a stuck campaign fails the test instead
    /// of hanging it.
    pub async fn wait_for_terminal(&self, campaign_id: &str, deadline: Duration) -> Campaign {
        let started = tokio::time::Instant::now();
        loop {
            let campaign = self
                .dispatcher
                .get_campaign(campaign_id)
                .await
                .expect("campaign should exist");
            if campaign.status.is_terminal() {
                return campaign;
            }
            if started.elapsed() > deadline {
                panic!(
                    "campaign {campaign_id} still {} after {deadline:?}",
                    campaign.status
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Convenience recipient constructor used across dispatcher tests.
    pub fn recipient(id: &str, name: &str, phone: &str) -> Recipient {
        Recipient {
            id: id.to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
            attributes: Default::default(),
        }
    }
}
