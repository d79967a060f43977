//! Read-only aggregate queries backed by the schema's SQL views (§4.C).

use beehive_shared::errors::BeehiveResult;
use beehive_shared::model::{BeeName, Task};

use crate::rows::TaskRow;
use crate::Store;

/// A row of the `active_tasks` view: a pending/in-progress task plus the
/// counts `status`/`progress` need without a second round trip.
#[derive(Debug, Clone)]
pub struct ActiveTaskSummary {
    pub task: Task,
    pub dependency_count: i64,
    pub child_count: i64,
}

/// A row of the `agent_workload` view.
#[derive(Debug, Clone)]
pub struct AgentWorkloadSummary {
    pub bee_name: BeeName,
    pub active_task_count: i64,
    pub active_assignment_count: i64,
}

impl Store {
    pub async fn active_tasks(&self) -> BeehiveResult<Vec<ActiveTaskSummary>> {
        #[derive(sqlx::FromRow)]
        struct Row {
            task_id: String,
            title: String,
            description: String,
            status: String,
            priority: String,
            assigned_to: Option<String>,
            created_at: chrono::DateTime<chrono::Utc>,
            updated_at: chrono::DateTime<chrono::Utc>,
            started_at: Option<chrono::DateTime<chrono::Utc>>,
            completed_at: Option<chrono::DateTime<chrono::Utc>>,
            created_by: String,
            parent_task_id: Option<String>,
            metadata: String,
            dependency_count: i64,
            child_count: i64,
        }

        let rows: Vec<Row> = Store::with_retry(|| {
            sqlx::query_as("SELECT * FROM active_tasks ORDER BY created_at ASC").fetch_all(self.pool())
        })
        .await?;

        rows.into_iter()
            .map(|r| {
                let task_row = TaskRow {
                    task_id: r.task_id,
                    title: r.title,
                    description: r.description,
                    status: r.status,
                    priority: r.priority,
                    assigned_to: r.assigned_to,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                    started_at: r.started_at,
                    completed_at: r.completed_at,
                    created_by: r.created_by,
                    parent_task_id: r.parent_task_id,
                    metadata: r.metadata,
                };
                Ok(ActiveTaskSummary {
                    task: task_row.into_task()?,
                    dependency_count: r.dependency_count,
                    child_count: r.child_count,
                })
            })
            .collect()
    }

    pub async fn agent_workload(&self) -> BeehiveResult<Vec<AgentWorkloadSummary>> {
        let rows: Vec<(String, i64, i64)> = Store::with_retry(|| {
            sqlx::query_as(
                "SELECT bee_name, active_task_count, active_assignment_count FROM agent_workload
                 ORDER BY bee_name ASC",
            )
            .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter()
            .map(|(bee, active_tasks, active_assignments)| {
                Ok(AgentWorkloadSummary {
                    bee_name: crate::rows::parse_field("bee_name", &bee)?,
                    active_task_count: active_tasks,
                    active_assignment_count: active_assignments,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use beehive_shared::model::{Priority, Task, TaskStatus};
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn active_tasks_excludes_terminal_statuses() {
        let store = Store::connect_in_memory().await.unwrap();
        let now = Utc::now();
        let pending = Task {
            task_id: Uuid::new_v4(),
            title: "pending task".to_string(),
            description: "d".to_string(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            assigned_to: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            created_by: "queen".to_string(),
            parent_task_id: None,
            metadata: serde_json::json!({}),
        };
        let mut done = pending.clone();
        done.task_id = Uuid::new_v4();
        done.status = TaskStatus::Completed;
        done.completed_at = Some(now);

        store.create_task(&pending).await.unwrap();
        store.create_task(&done).await.unwrap();

        let active = store.active_tasks().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].task.task_id, pending.task_id);
    }

    #[tokio::test]
    async fn agent_workload_reflects_assigned_active_tasks() {
        let store = Store::connect_in_memory().await.unwrap();
        let now = Utc::now();
        let task = Task {
            task_id: Uuid::new_v4(),
            title: "t".to_string(),
            description: "d".to_string(),
            status: TaskStatus::InProgress,
            priority: Priority::Medium,
            assigned_to: Some(BeeName::Developer),
            created_at: now,
            updated_at: now,
            started_at: Some(now),
            completed_at: None,
            created_by: "queen".to_string(),
            parent_task_id: None,
            metadata: serde_json::json!({}),
        };
        store.create_task(&task).await.unwrap();

        let workload = store.agent_workload().await.unwrap();
        let developer = workload
            .iter()
            .find(|w| w.bee_name == BeeName::Developer)
            .unwrap();
        assert_eq!(developer.active_task_count, 1);
    }
}
