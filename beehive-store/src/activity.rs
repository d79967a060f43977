//! Append-only task activity log (§3, §4.C). No update or delete path
//! exists on purpose — entries are only ever inserted and read.

use beehive_shared::errors::BeehiveResult;
use beehive_shared::model::{ActivityEntry, ActivityType, BeeName};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::rows::ActivityRow;
use crate::Store;

impl Store {
    #[allow(clippy::too_many_arguments)]
    pub async fn append_activity(
        &self,
        task_id: Uuid,
        bee_name: Option<BeeName>,
        activity_type: ActivityType,
        description: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> BeehiveResult<i64> {
        let result = Store::with_retry(|| {
            sqlx::query(
                "INSERT INTO activity_log (task_id, bee_name, activity_type, description,
                    old_value, new_value, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(task_id.to_string())
            .bind(bee_name.map(|b| b.as_str().to_string()))
            .bind(activity_type.as_str())
            .bind(description)
            .bind(old_value)
            .bind(new_value)
            .bind(created_at)
            .execute(self.pool())
        })
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn list_activity(&self, task_id: Uuid) -> BeehiveResult<Vec<ActivityEntry>> {
        let rows: Vec<ActivityRow> = Store::with_retry(|| {
            sqlx::query_as("SELECT * FROM activity_log WHERE task_id = ? ORDER BY created_at ASC")
                .bind(task_id.to_string())
                .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter().map(ActivityRow::into_activity_entry).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_list_preserves_order() {
        let store = Store::connect_in_memory().await.unwrap();
        let task_id = Uuid::new_v4();

        // activity_log has no FK enforcement toggle in these tests; insert
        // a matching task row first since the schema references tasks.
        store
            .create_task(&beehive_shared::model::Task {
                task_id,
                title: "t".to_string(),
                description: "d".to_string(),
                status: beehive_shared::model::TaskStatus::Pending,
                priority: beehive_shared::model::Priority::Medium,
                assigned_to: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                started_at: None,
                completed_at: None,
                created_by: "queen".to_string(),
                parent_task_id: None,
                metadata: serde_json::json!({}),
            })
            .await
            .unwrap();

        store
            .append_activity(
                task_id,
                Some(BeeName::Queen),
                ActivityType::Created,
                "task created",
                None,
                None,
                Utc::now(),
            )
            .await
            .unwrap();
        store
            .append_activity(
                task_id,
                Some(BeeName::Developer),
                ActivityType::StatusChange,
                "status changed",
                Some("pending"),
                Some("in_progress"),
                Utc::now(),
            )
            .await
            .unwrap();

        let entries = store.list_activity(task_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].activity_type, ActivityType::Created);
        assert_eq!(entries[1].new_value.as_deref(), Some("in_progress"));
    }
}
