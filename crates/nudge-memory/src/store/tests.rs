use super::Store;
use crate::records::{NewFollowup, NewProcessedMessage};
use nudge_core::triage::{FollowupStatus, Urgency};
use std::collections::HashMap;

async fn test_store() -> Store {
    Store::in_memory().await.unwrap()
}

fn record(key: &str, channel: &str, actionable: bool, urgency: Urgency) -> NewProcessedMessage {
    NewProcessedMessage {
        identity_key: key.to_string(),
        channel_id: channel.to_string(),
        owner_user_id: "u-1".to_string(),
        is_actionable: actionable,
        task_summary: actionable.then(|| format!("task for {key}")),
        deadline: None,
        assignee: None,
        urgency,
        trigger_message: None,
        nudge_draft: None,
        external_task_id: None,
        external_task_url: None,
    }
}

#[tokio::test]
async fn test_upsert_replaces_instead_of_duplicating() {
    let store = test_store().await;
    store
        .upsert_processed(&[record("1.0", "C01", false, Urgency::Medium)])
        .await
        .unwrap();

    let mut updated = record("1.0", "C01", true, Urgency::High);
    updated.task_summary = Some("now actionable".to_string());
    store.upsert_processed(&[updated]).await.unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM processed_messages")
        .fetch_one(&store.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let rows = store.actionable_for_channel("u-1", "C01").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].task_summary.as_deref(), Some("now actionable"));
    assert_eq!(rows[0].urgency(), Urgency::High);
}

#[tokio::test]
async fn test_upsert_preserves_row_identity() {
    let store = test_store().await;
    store
        .upsert_processed(&[record("1.0", "C01", true, Urgency::Low)])
        .await
        .unwrap();
    let before = store.actionable_for_channel("u-1", "C01").await.unwrap();

    store
        .upsert_processed(&[record("1.0", "C01", true, Urgency::Critical)])
        .await
        .unwrap();
    let after = store.actionable_for_channel("u-1", "C01").await.unwrap();

    assert_eq!(before[0].id, after[0].id);
    assert_eq!(before[0].created_at, after[0].created_at);
}

#[tokio::test]
async fn test_existing_keys() {
    let store = test_store().await;
    store
        .upsert_processed(&[
            record("1.0", "C01", false, Urgency::Medium),
            record("2.0", "C01", false, Urgency::Medium),
            record("1.0", "C02", false, Urgency::Medium),
        ])
        .await
        .unwrap();

    let keys = vec!["1.0".to_string(), "3.0".to_string()];
    let existing = store.existing_keys("C01", &keys).await.unwrap();
    assert!(existing.contains("1.0"));
    assert!(!existing.contains("3.0"));
    assert_eq!(existing.len(), 1);

    assert!(store.existing_keys("C01", &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_actionable_sorted_by_urgency_then_recency() {
    let store = test_store().await;
    store
        .upsert_processed(&[
            record("1.0", "C01", true, Urgency::Low),
            record("2.0", "C01", true, Urgency::Critical),
            record("3.0", "C01", true, Urgency::High),
            record("4.0", "C01", true, Urgency::High),
            record("5.0", "C01", false, Urgency::Critical),
        ])
        .await
        .unwrap();

    // Spread created_at so recency within a tier is observable.
    for (key, ts) in [
        ("1.0", "2026-08-01 10:00:00"),
        ("2.0", "2026-08-01 11:00:00"),
        ("3.0", "2026-08-01 12:00:00"),
        ("4.0", "2026-08-02 12:00:00"),
    ] {
        sqlx::query("UPDATE processed_messages SET created_at = ? WHERE identity_key = ?")
            .bind(ts)
            .bind(key)
            .execute(&store.pool)
            .await
            .unwrap();
    }

    let rows = store.actionable_for_channel("u-1", "C01").await.unwrap();
    let keys: Vec<&str> = rows.iter().map(|r| r.identity_key.as_str()).collect();
    // critical, then high (newer first), then low; non-actionable excluded.
    assert_eq!(keys, vec!["2.0", "4.0", "3.0", "1.0"]);

    let mut last_rank = 0;
    for row in &rows {
        assert!(row.urgency().rank() >= last_rank);
        last_rank = row.urgency().rank();
    }
}

#[tokio::test]
async fn test_mark_nudge_sent() {
    let store = test_store().await;
    store
        .upsert_processed(&[record("1.0", "C01", true, Urgency::High)])
        .await
        .unwrap();
    let row = store.actionable_for_channel("u-1", "C01").await.unwrap()[0].clone();
    assert!(!row.nudge_sent);

    store
        .mark_nudge_sent(&row.id, "u-1", "2026-08-25T09:00:00+00:00")
        .await
        .unwrap();

    let row = store.get_processed(&row.id, "u-1").await.unwrap().unwrap();
    assert!(row.nudge_sent);
    assert_eq!(
        row.nudge_sent_at.as_deref(),
        Some("2026-08-25T09:00:00+00:00")
    );
}

fn followup(key: &str, at: &str, pm_id: &str) -> NewFollowup {
    NewFollowup {
        processed_message_id: pm_id.to_string(),
        channel_id: "C01".to_string(),
        identity_key: key.to_string(),
        owner_user_id: "u-1".to_string(),
        task_summary: "follow up".to_string(),
        assignee: None,
        urgency: Urgency::Medium,
        followup_at: at.to_string(),
        external_task_id: None,
    }
}

#[tokio::test]
async fn test_followup_unique_per_conversation_unit() {
    let store = test_store().await;
    store
        .upsert_processed(&[record("1.0", "C01", true, Urgency::Medium)])
        .await
        .unwrap();
    let pm = store.actionable_for_channel("u-1", "C01").await.unwrap()[0].clone();

    let first = store
        .create_followup(&followup("1.0", "2026-08-27T09:00:00+00:00", &pm.id))
        .await
        .unwrap();
    assert!(first.is_some());

    let second = store
        .create_followup(&followup("1.0", "2026-08-28T09:00:00+00:00", &pm.id))
        .await
        .unwrap();
    assert!(second.is_none());
}

#[tokio::test]
async fn test_due_followups_filtered_and_ordered() {
    let store = test_store().await;
    store
        .upsert_processed(&[
            record("1.0", "C01", true, Urgency::Medium),
            record("2.0", "C01", true, Urgency::Medium),
            record("3.0", "C01", true, Urgency::Medium),
        ])
        .await
        .unwrap();
    let rows = store.actionable_for_channel("u-1", "C01").await.unwrap();
    let pm_id = rows[0].id.clone();

    store
        .create_followup(&followup("1.0", "2026-08-20T09:00:00+00:00", &pm_id))
        .await
        .unwrap();
    store
        .create_followup(&followup("2.0", "2026-08-10T09:00:00+00:00", &pm_id))
        .await
        .unwrap();
    // Not yet due.
    store
        .create_followup(&followup("3.0", "2026-09-01T09:00:00+00:00", &pm_id))
        .await
        .unwrap();

    let due = store
        .due_followups("u-1", "2026-08-25T00:00:00+00:00")
        .await
        .unwrap();
    assert_eq!(due.len(), 2);
    assert_eq!(due[0].identity_key, "2.0");
    assert_eq!(due[1].identity_key, "1.0");

    // A resolved followup drops out of the due list.
    store
        .set_followup_status(&due[0].id, "u-1", FollowupStatus::Resolved)
        .await
        .unwrap();
    let due = store
        .due_followups("u-1", "2026-08-25T00:00:00+00:00")
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].identity_key, "1.0");
}

#[tokio::test]
async fn test_integration_upsert_and_lookup() {
    let store = test_store().await;
    assert!(store.get_integration("u-1").await.unwrap().is_none());

    let mut config = HashMap::new();
    config.insert("team_id".to_string(), "team-1".to_string());
    store
        .upsert_integration("u-1", "linear", &config, "lin_api_xyz")
        .await
        .unwrap();

    let integration = store.get_integration("u-1").await.unwrap().unwrap();
    assert_eq!(integration.provider, "linear");
    assert_eq!(
        integration.config_map().get("team_id").map(String::as_str),
        Some("team-1")
    );

    // Re-configuring the same provider replaces the row.
    config.insert("team_id".to_string(), "team-2".to_string());
    store
        .upsert_integration("u-1", "linear", &config, "lin_api_new")
        .await
        .unwrap();
    let integration = store.get_integration("u-1").await.unwrap().unwrap();
    assert_eq!(integration.api_token, "lin_api_new");
    assert_eq!(
        integration.config_map().get("team_id").map(String::as_str),
        Some("team-2")
    );
}
