// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call result operations.
//!
//! Terminal updates and the owning campaign's counter increments ride in
//! one transaction, and the status update is guarded so an already-terminal
//! row is never touched twice. Counters therefore stay conserved no matter
//! how workers race.

use dialflow_core::types::CallResult;
use dialflow_core::DialflowError;
use rusqlite::params;

use crate::database::Database;

const RESULT_COLUMNS: &str = "id, campaign_id, customer_id, customer_name, customer_phone, \
     dispatch_order, status, outcome, duration_seconds, recording_url, error_message, \
     created_at, updated_at";

fn result_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CallResult> {
    let status: String = row.get(6)?;
    let outcome: Option<String> = row.get(7)?;
    Ok(CallResult {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        customer_id: row.get(2)?,
        customer_name: row.get(3)?,
        customer_phone: row.get(4)?,
        dispatch_order: row.get(5)?,
        status: status.parse().map_err(|e| text_conversion(6, e))?,
        outcome: outcome
            .map(|o| o.parse().map_err(|e| text_conversion(7, e)))
            .transpose()?,
        duration_seconds: row.get(8)?,
        recording_url: row.get(9)?,
        error_message: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn text_conversion(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Insert a freshly claimed call result (normally `in_progress`).
pub async fn create_call_result(db: &Database, result: &CallResult) -> Result<(), DialflowError> {
    let result = result.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO call_results (id, campaign_id, customer_id, customer_name,
                     customer_phone, dispatch_order, status, outcome, duration_seconds,
                     recording_url, error_message, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    result.id,
                    result.campaign_id,
                    result.customer_id,
                    result.customer_name,
                    result.customer_phone,
                    result.dispatch_order,
                    result.status.to_string(),
                    result.outcome.map(|o| o.to_string()),
                    result.duration_seconds,
                    result.recording_url,
                    result.error_message,
                    result.created_at,
                    result.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a terminal status to an existing result and bump the owning
/// campaign's counters, all in one transaction.
///
/// The UPDATE is guarded on the row still being non-terminal; when the guard
/// misses (the row was already finished), the counters are left alone.
pub async fn complete_call_result(db: &Database, result: &CallResult) -> Result<(), DialflowError> {
    let result = result.clone();
    db.connection()
        .call(move |conn| {
            let status = result.status.to_string();
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE call_results
                 SET status = ?1, outcome = ?2, duration_seconds = ?3, recording_url = ?4,
                     error_message = ?5, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?6 AND status IN ('queued', 'in_progress')",
                params![
                    status,
                    result.outcome.map(|o| o.to_string()),
                    result.duration_seconds,
                    result.recording_url,
                    result.error_message,
                    result.id,
                ],
            )?;
            if changed > 0 {
                tx.execute(
                    "UPDATE campaigns
                     SET completed_calls = completed_calls + 1,
                         successful_calls = successful_calls + (?1 = 'success'),
                         failed_calls = failed_calls + (?1 = 'failed')
                     WHERE id = ?2",
                    params![status, result.campaign_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert a terminal `cancelled` result for a recipient no worker ever
/// claimed, bumping `completed_calls` in the same transaction.
pub async fn insert_cancelled_result(
    db: &Database,
    result: &CallResult,
) -> Result<(), DialflowError> {
    let result = result.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO call_results (id, campaign_id, customer_id, customer_name,
                     customer_phone, dispatch_order, status, outcome, duration_seconds,
                     recording_url, error_message, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'cancelled', NULL, NULL, NULL, NULL, ?7, ?8)",
                params![
                    result.id,
                    result.campaign_id,
                    result.customer_id,
                    result.customer_name,
                    result.customer_phone,
                    result.dispatch_order,
                    result.created_at,
                    result.updated_at,
                ],
            )?;
            tx.execute(
                "UPDATE campaigns SET completed_calls = completed_calls + 1 WHERE id = ?1",
                params![result.campaign_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All results for a campaign, in dispatch order.
pub async fn list_call_results(
    db: &Database,
    campaign_id: &str,
) -> Result<Vec<CallResult>, DialflowError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RESULT_COLUMNS} FROM call_results
                 WHERE campaign_id = ?1 ORDER BY dispatch_order ASC"
            ))?;
            let rows = stmt.query_map(params![campaign_id], result_from_row)?;
            let mut results = Vec::new();
            for row in rows {
                results.push(row?);
            }
            Ok(results)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::campaigns;
    use dialflow_core::types::{
        AgentType, CallOutcome, CallStatus, Campaign, CampaignStatus,
    };
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn seed_campaign(db: &Database, id: &str, total: u32) {
        let campaign = Campaign {
            id: id.to_string(),
            name: "test".to_string(),
            script_content: "Hi {name}".to_string(),
            agent_type: AgentType::Sales,
            concurrency_limit: 2,
            use_knowledge_base: false,
            custom_system_prompt: None,
            recipient_ids: (0..total).map(|i| format!("c{i}")).collect(),
            status: CampaignStatus::Running,
            total_calls: total,
            completed_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            started_at: None,
            completed_at: None,
        };
        campaigns::create_campaign(db, &campaign).await.unwrap();
    }

    fn make_result(id: &str, campaign_id: &str, customer_id: &str, order: i64) -> CallResult {
        CallResult {
            id: id.to_string(),
            campaign_id: campaign_id.to_string(),
            customer_id: customer_id.to_string(),
            customer_name: "Dana".to_string(),
            customer_phone: "+15550100".to_string(),
            dispatch_order: order,
            status: CallStatus::InProgress,
            outcome: None,
            duration_seconds: None,
            recording_url: None,
            error_message: None,
            created_at: "2026-01-01T00:00:01.000Z".to_string(),
            updated_at: "2026-01-01T00:00:01.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn complete_bumps_counters_in_same_transaction() {
        let (db, _dir) = setup_db().await;
        seed_campaign(&db, "camp-1", 2).await;

        let r1 = make_result("r1", "camp-1", "c0", 0);
        create_call_result(&db, &r1).await.unwrap();

        let mut done = r1.clone();
        done.status = CallStatus::Success;
        done.outcome = Some(CallOutcome::Interested);
        done.duration_seconds = Some(42);
        complete_call_result(&db, &done).await.unwrap();

        let campaign = campaigns::get_campaign(&db, "camp-1").await.unwrap().unwrap();
        assert_eq!(campaign.completed_calls, 1);
        assert_eq!(campaign.successful_calls, 1);
        assert_eq!(campaign.failed_calls, 0);

        let stored = &list_call_results(&db, "camp-1").await.unwrap()[0];
        assert_eq!(stored.status, CallStatus::Success);
        assert_eq!(stored.outcome, Some(CallOutcome::Interested));
        assert_eq!(stored.duration_seconds, Some(42));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn terminal_results_are_immutable() {
        let (db, _dir) = setup_db().await;
        seed_campaign(&db, "camp-2", 1).await;

        let r = make_result("r1", "camp-2", "c0", 0);
        create_call_result(&db, &r).await.unwrap();

        let mut first = r.clone();
        first.status = CallStatus::Failed;
        first.error_message = Some("line dropped".to_string());
        complete_call_result(&db, &first).await.unwrap();

        // A second terminal write must neither change the row nor bump
        // counters again.
        let mut second = r.clone();
        second.status = CallStatus::Success;
        complete_call_result(&db, &second).await.unwrap();

        let stored = &list_call_results(&db, "camp-2").await.unwrap()[0];
        assert_eq!(stored.status, CallStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("line dropped"));

        let campaign = campaigns::get_campaign(&db, "camp-2").await.unwrap().unwrap();
        assert_eq!(campaign.completed_calls, 1);
        assert_eq!(campaign.successful_calls, 0);
        assert_eq!(campaign.failed_calls, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_insert_counts_toward_completed_only() {
        let (db, _dir) = setup_db().await;
        seed_campaign(&db, "camp-3", 1).await;

        let mut r = make_result("r1", "camp-3", "c0", 0);
        r.status = CallStatus::Cancelled;
        insert_cancelled_result(&db, &r).await.unwrap();

        let stored = &list_call_results(&db, "camp-3").await.unwrap()[0];
        assert_eq!(stored.status, CallStatus::Cancelled);
        assert!(stored.outcome.is_none());

        let campaign = campaigns::get_campaign(&db, "camp-3").await.unwrap().unwrap();
        assert_eq!(campaign.completed_calls, 1);
        assert_eq!(campaign.successful_calls, 0);
        assert_eq!(campaign.failed_calls, 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_orders_by_dispatch_order() {
        let (db, _dir) = setup_db().await;
        seed_campaign(&db, "camp-4", 3).await;

        // Insert out of order.
        for (id, customer, order) in [("r2", "c2", 2_i64), ("r0", "c0", 0), ("r1", "c1", 1)] {
            create_call_result(&db, &make_result(id, "camp-4", customer, order))
                .await
                .unwrap();
        }

        let results = list_call_results(&db, "camp-4").await.unwrap();
        let orders: Vec<i64> = results.iter().map(|r| r.dispatch_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_claim_for_same_customer_is_rejected() {
        let (db, _dir) = setup_db().await;
        seed_campaign(&db, "camp-5", 1).await;

        create_call_result(&db, &make_result("r1", "camp-5", "c0", 0))
            .await
            .unwrap();
        let dup = create_call_result(&db, &make_result("r2", "camp-5", "c0", 1)).await;
        assert!(dup.is_err(), "UNIQUE(campaign_id, customer_id) should reject");

        db.close().await.unwrap();
    }
}
