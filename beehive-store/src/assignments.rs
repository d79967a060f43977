//! Assignment rows (§4.C, §4.E `assign`) — one row per assignment event;
//! reassigning a task does not overwrite the prior row, it supersedes it.

use beehive_shared::errors::BeehiveResult;
use beehive_shared::model::{Assignment, AssignmentRole, AssignmentStatus, BeeName};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::rows::AssignmentRow;
use crate::Store;

impl Store {
    pub async fn create_assignment(&self, assignment: &Assignment) -> BeehiveResult<()> {
        Store::with_retry(|| {
            sqlx::query(
                "INSERT INTO assignments (assignment_id, task_id, assignee, assigner, assigned_at,
                    accepted_at, completed_at, role, status)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(assignment.assignment_id.to_string())
            .bind(assignment.task_id.to_string())
            .bind(assignment.assignee.as_str())
            .bind(&assignment.assigner)
            .bind(assignment.assigned_at)
            .bind(assignment.accepted_at)
            .bind(assignment.completed_at)
            .bind(assignment.role.as_str())
            .bind(assignment.status.as_str())
            .execute(self.pool())
        })
        .await?;
        Ok(())
    }

    pub async fn list_assignments(&self, task_id: Uuid) -> BeehiveResult<Vec<Assignment>> {
        let rows: Vec<AssignmentRow> = Store::with_retry(|| {
            sqlx::query_as("SELECT * FROM assignments WHERE task_id = ? ORDER BY assigned_at ASC")
                .bind(task_id.to_string())
                .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter().map(AssignmentRow::into_assignment).collect()
    }

    /// The current primary assignee, if one is active (not yet superseded)
    /// — the engine's `AlreadyAssigned` check reads this before inserting
    /// a new primary row.
    pub async fn active_primary_assignment(&self, task_id: Uuid) -> BeehiveResult<Option<Assignment>> {
        let row: Option<AssignmentRow> = Store::with_retry(|| {
            sqlx::query_as(
                "SELECT * FROM assignments WHERE task_id = ? AND role = 'primary'
                 AND status IN ('active', 'accepted') ORDER BY assigned_at DESC LIMIT 1",
            )
            .bind(task_id.to_string())
            .fetch_optional(self.pool())
        })
        .await?;

        row.map(AssignmentRow::into_assignment).transpose()
    }

    pub async fn supersede_assignment(&self, assignment_id: Uuid, now: DateTime<Utc>) -> BeehiveResult<()> {
        Store::with_retry(|| {
            sqlx::query(
                "UPDATE assignments SET status = 'superseded', completed_at = ? WHERE assignment_id = ?",
            )
            .bind(now)
            .bind(assignment_id.to_string())
            .execute(self.pool())
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use beehive_shared::model::{Priority, Task, TaskStatus};

    use super::*;

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            task_id: Uuid::new_v4(),
            title: "t".to_string(),
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
        }
    }

    fn sample_assignment(task_id: Uuid, role: AssignmentRole) -> Assignment {
        let now = Utc::now();
        Assignment {
            assignment_id: Uuid::new_v4(),
            task_id,
            assignee: BeeName::Developer,
            assigner: "queen".to_string(),
            assigned_at: now,
            accepted_at: None,
            completed_at: None,
            role,
            status: AssignmentStatus::Active,
        }
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let store = Store::connect_in_memory().await.unwrap();
        let task = sample_task();
        store.create_task(&task).await.unwrap();

        let assignment = sample_assignment(task.task_id, AssignmentRole::Primary);
        store.create_assignment(&assignment).await.unwrap();

        let listed = store.list_assignments(task.task_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].assignee, BeeName::Developer);
    }

    #[tokio::test]
    async fn active_primary_assignment_ignores_superseded() {
        let store = Store::connect_in_memory().await.unwrap();
        let task = sample_task();
        store.create_task(&task).await.unwrap();

        let first = sample_assignment(task.task_id, AssignmentRole::Primary);
        store.create_assignment(&first).await.unwrap();
        store
            .supersede_assignment(first.assignment_id, Utc::now())
            .await
            .unwrap();

        assert!(store.active_primary_assignment(task.task_id).await.unwrap().is_none());

        let second = sample_assignment(task.task_id, AssignmentRole::Primary);
        store.create_assignment(&second).await.unwrap();
        let active = store.active_primary_assignment(task.task_id).await.unwrap().unwrap();
        assert_eq!(active.assignment_id, second.assignment_id);
    }
}
