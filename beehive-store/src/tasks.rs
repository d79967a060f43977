//! Task CRUD and status/assignee transitions (§4.C).

use beehive_shared::errors::{BeehiveError, BeehiveResult};
use beehive_shared::model::{BeeName, Task, TaskStatus};
use uuid::Uuid;

use crate::rows::TaskRow;
use crate::Store;

impl Store {
    /// Insert a fully-formed `Task`. Callers (the engine) own id generation
    /// and timestamp stamping; the store only persists and round-trips.
    pub async fn create_task(&self, task: &Task) -> BeehiveResult<()> {
        let metadata = serde_json::to_string(&task.metadata).map_err(BeehiveError::Serde)?;
        Store::with_retry(|| {
            sqlx::query(
                "INSERT INTO tasks (task_id, title, description, status, priority, assigned_to,
                    created_at, updated_at, started_at, completed_at, created_by, parent_task_id, metadata)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(task.task_id.to_string())
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.status.as_str())
            .bind(task.priority.as_str())
            .bind(task.assigned_to.map(|b| b.as_str().to_string()))
            .bind(task.created_at)
            .bind(task.updated_at)
            .bind(task.started_at)
            .bind(task.completed_at)
            .bind(&task.created_by)
            .bind(task.parent_task_id.map(|p| p.to_string()))
            .bind(&metadata)
            .execute(self.pool())
        })
        .await?;
        Ok(())
    }

    pub async fn get_task(&self, task_id: Uuid) -> BeehiveResult<Option<Task>> {
        let row: Option<TaskRow> = Store::with_retry(|| {
            sqlx::query_as("SELECT * FROM tasks WHERE task_id = ?")
                .bind(task_id.to_string())
                .fetch_optional(self.pool())
        })
        .await?;
        row.map(TaskRow::into_task).transpose()
    }

    /// `status`/`assigned_to` narrow the listing; `None` means unfiltered.
    pub async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        assigned_to: Option<BeeName>,
    ) -> BeehiveResult<Vec<Task>> {
        let rows: Vec<TaskRow> = Store::with_retry(|| {
            let mut query = String::from("SELECT * FROM tasks WHERE 1 = 1");
            if status.is_some() {
                query.push_str(" AND status = ?");
            }
            if assigned_to.is_some() {
                query.push_str(" AND assigned_to = ?");
            }
            query.push_str(" ORDER BY created_at ASC");

            let mut q = sqlx::query_as(&query);
            if let Some(s) = status {
                q = q.bind(s.as_str());
            }
            if let Some(b) = assigned_to {
                q = q.bind(b.as_str());
            }
            q.fetch_all(self.pool())
        })
        .await?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    /// Subtasks and dependency-following tasks of `task_id` (children with
    /// `parent_task_id = task_id`), for recursive cancellation (§4.D).
    pub async fn list_children(&self, task_id: Uuid) -> BeehiveResult<Vec<Task>> {
        let rows: Vec<TaskRow> = Store::with_retry(|| {
            sqlx::query_as("SELECT * FROM tasks WHERE parent_task_id = ?")
                .bind(task_id.to_string())
                .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    pub async fn set_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        now: chrono::DateTime<chrono::Utc>,
    ) -> BeehiveResult<()> {
        let started_clause = if status == TaskStatus::InProgress {
            "started_at = COALESCE(started_at, ?2),"
        } else {
            ""
        };
        let completed_clause = if status.is_terminal() {
            "completed_at = ?2,"
        } else {
            ""
        };

        let sql = format!(
            "UPDATE tasks SET status = ?1, updated_at = ?2, {started_clause} {completed_clause} task_id = task_id
             WHERE task_id = ?3"
        );

        let result = Store::with_retry(|| {
            sqlx::query(&sql)
                .bind(status.as_str())
                .bind(now)
                .bind(task_id.to_string())
                .execute(self.pool())
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(BeehiveError::TaskNotFound(task_id));
        }
        Ok(())
    }

    pub async fn set_assignee(
        &self,
        task_id: Uuid,
        assignee: Option<BeeName>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> BeehiveResult<()> {
        let result = Store::with_retry(|| {
            sqlx::query("UPDATE tasks SET assigned_to = ?, updated_at = ? WHERE task_id = ?")
                .bind(assignee.map(|b| b.as_str().to_string()))
                .bind(now)
                .bind(task_id.to_string())
                .execute(self.pool())
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(BeehiveError::TaskNotFound(task_id));
        }
        Ok(())
    }
}
