// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign CRUD operations.

use dialflow_core::types::{Campaign, CampaignStatus};
use dialflow_core::DialflowError;
use rusqlite::params;

use crate::database::Database;

const CAMPAIGN_COLUMNS: &str = "id, name, script_content, agent_type, concurrency_limit, \
     use_knowledge_base, custom_system_prompt, recipient_ids, status, total_calls, \
     completed_calls, successful_calls, failed_calls, created_at, started_at, completed_at";

fn campaign_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    let agent_type: String = row.get(3)?;
    let recipient_ids: String = row.get(7)?;
    let status: String = row.get(8)?;
    Ok(Campaign {
        id: row.get(0)?,
        name: row.get(1)?,
        script_content: row.get(2)?,
        agent_type: agent_type.parse().map_err(|e| text_conversion(3, e))?,
        concurrency_limit: row.get(4)?,
        use_knowledge_base: row.get(5)?,
        custom_system_prompt: row.get(6)?,
        recipient_ids: serde_json::from_str(&recipient_ids)
            .map_err(|e| text_conversion(7, e))?,
        status: status.parse().map_err(|e| text_conversion(8, e))?,
        total_calls: row.get(9)?,
        completed_calls: row.get(10)?,
        successful_calls: row.get(11)?,
        failed_calls: row.get(12)?,
        created_at: row.get(13)?,
        started_at: row.get(14)?,
        completed_at: row.get(15)?,
    })
}

fn text_conversion(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Insert a new campaign row.
pub async fn create_campaign(db: &Database, campaign: &Campaign) -> Result<(), DialflowError> {
    let campaign = campaign.clone();
    db.connection()
        .call(move |conn| {
            let recipient_ids = serde_json::to_string(&campaign.recipient_ids)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                "INSERT INTO campaigns (id, name, script_content, agent_type, concurrency_limit,
                     use_knowledge_base, custom_system_prompt, recipient_ids, status, total_calls,
                     completed_calls, successful_calls, failed_calls, created_at, started_at,
                     completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    campaign.id,
                    campaign.name,
                    campaign.script_content,
                    campaign.agent_type.to_string(),
                    campaign.concurrency_limit,
                    campaign.use_knowledge_base,
                    campaign.custom_system_prompt,
                    recipient_ids,
                    campaign.status.to_string(),
                    campaign.total_calls,
                    campaign.completed_calls,
                    campaign.successful_calls,
                    campaign.failed_calls,
                    campaign.created_at,
                    campaign.started_at,
                    campaign.completed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a campaign by ID.
pub async fn get_campaign(db: &Database, id: &str) -> Result<Option<Campaign>, DialflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], campaign_from_row);
            match result {
                Ok(campaign) => Ok(Some(campaign)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all campaigns, newest first.
pub async fn list_campaigns(db: &Database) -> Result<Vec<Campaign>, DialflowError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map([], campaign_from_row)?;
            let mut campaigns = Vec::new();
            for row in rows {
                campaigns.push(row?);
            }
            Ok(campaigns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update only the status column (pause/resume bookkeeping). Terminal
/// campaigns are never touched.
pub async fn update_campaign_status(
    db: &Database,
    id: &str,
    status: CampaignStatus,
) -> Result<(), DialflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns SET status = ?1
                 WHERE id = ?2 AND status NOT IN ('completed', 'failed', 'cancelled')",
                params![status.to_string(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transition to `running` and stamp `started_at` on the first transition
/// only; resume after pause keeps the original start timestamp.
pub async fn mark_campaign_started(db: &Database, id: &str) -> Result<(), DialflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns
                 SET status = 'running',
                     started_at = COALESCE(started_at, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record the terminal campaign status and stamp `completed_at`.
pub async fn mark_campaign_finished(
    db: &Database,
    id: &str,
    status: CampaignStatus,
) -> Result<(), DialflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns
                 SET status = ?1,
                     completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![status.to_string(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialflow_core::types::AgentType;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_campaign(id: &str) -> Campaign {
        Campaign {
            id: id.to_string(),
            name: "spring outreach".to_string(),
            script_content: "Hi {name}".to_string(),
            agent_type: AgentType::Sales,
            concurrency_limit: 3,
            use_knowledge_base: false,
            custom_system_prompt: None,
            recipient_ids: vec!["c1".to_string(), "c2".to_string()],
            status: CampaignStatus::Queued,
            total_calls: 2,
            completed_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            started_at: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn create_and_get_campaign_roundtrips() {
        let (db, _dir) = setup_db().await;
        let campaign = make_campaign("camp-1");

        create_campaign(&db, &campaign).await.unwrap();
        let retrieved = get_campaign(&db, "camp-1").await.unwrap().unwrap();
        assert_eq!(retrieved.name, "spring outreach");
        assert_eq!(retrieved.agent_type, AgentType::Sales);
        assert_eq!(retrieved.recipient_ids, vec!["c1", "c2"]);
        assert_eq!(retrieved.status, CampaignStatus::Queued);
        assert_eq!(retrieved.total_calls, 2);
        assert!(retrieved.started_at.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_campaign_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_campaign(&db, "no-such").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_started_stamps_once() {
        let (db, _dir) = setup_db().await;
        create_campaign(&db, &make_campaign("camp-s")).await.unwrap();

        mark_campaign_started(&db, "camp-s").await.unwrap();
        let first = get_campaign(&db, "camp-s").await.unwrap().unwrap();
        assert_eq!(first.status, CampaignStatus::Running);
        let started = first.started_at.clone().unwrap();

        // Pause then resume: started_at must not move.
        update_campaign_status(&db, "camp-s", CampaignStatus::Paused)
            .await
            .unwrap();
        mark_campaign_started(&db, "camp-s").await.unwrap();
        let second = get_campaign(&db, "camp-s").await.unwrap().unwrap();
        assert_eq!(second.status, CampaignStatus::Running);
        assert_eq!(second.started_at.unwrap(), started);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_finished_stamps_completed_at() {
        let (db, _dir) = setup_db().await;
        create_campaign(&db, &make_campaign("camp-f")).await.unwrap();

        mark_campaign_finished(&db, "camp-f", CampaignStatus::Completed)
            .await
            .unwrap();
        let done = get_campaign(&db, "camp-f").await.unwrap().unwrap();
        assert_eq!(done.status, CampaignStatus::Completed);
        assert!(done.completed_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_campaigns_returns_all() {
        let (db, _dir) = setup_db().await;
        create_campaign(&db, &make_campaign("camp-a")).await.unwrap();
        create_campaign(&db, &make_campaign("camp-b")).await.unwrap();

        let all = list_campaigns(&db).await.unwrap();
        assert_eq!(all.len(), 2);

        db.close().await.unwrap();
    }
}
