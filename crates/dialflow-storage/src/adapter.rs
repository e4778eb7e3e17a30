// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use dialflow_config::model::StorageConfig;
use dialflow_core::types::{CallResult, Campaign, CampaignStatus};
use dialflow_core::{AdapterType, DialflowError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`]
    /// is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, DialflowError> {
        self.db.get().ok_or_else(|| DialflowError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, DialflowError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DialflowError> {
        // Shutdown delegates to close if the DB was initialized.
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), DialflowError> {
        let path = self.config.database_path.clone();
        let db = Database::open(&path).await?;
        self.db.set(db).map_err(|_| DialflowError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), DialflowError> {
        self.db()?.close().await
    }

    // --- Campaign operations ---

    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), DialflowError> {
        queries::campaigns::create_campaign(self.db()?, campaign).await
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, DialflowError> {
        queries::campaigns::get_campaign(self.db()?, id).await
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, DialflowError> {
        queries::campaigns::list_campaigns(self.db()?).await
    }

    async fn update_campaign_status(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> Result<(), DialflowError> {
        queries::campaigns::update_campaign_status(self.db()?, id, status).await
    }

    async fn mark_campaign_started(&self, id: &str) -> Result<(), DialflowError> {
        queries::campaigns::mark_campaign_started(self.db()?, id).await
    }

    async fn mark_campaign_finished(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> Result<(), DialflowError> {
        queries::campaigns::mark_campaign_finished(self.db()?, id, status).await
    }

    // --- Call result operations ---

    async fn create_call_result(&self, result: &CallResult) -> Result<(), DialflowError> {
        queries::results::create_call_result(self.db()?, result).await
    }

    async fn complete_call_result(&self, result: &CallResult) -> Result<(), DialflowError> {
        queries::results::complete_call_result(self.db()?, result).await
    }

    async fn insert_cancelled_result(&self, result: &CallResult) -> Result<(), DialflowError> {
        queries::results::insert_cancelled_result(self.db()?, result).await
    }

    async fn list_call_results(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<CallResult>, DialflowError> {
        queries::results::list_call_results(self.db()?, campaign_id).await
    }
}
