//! # beehive-engine
//!
//! The Task Engine (§4.E): task creation, assignment, and status
//! transitions. Every operation here is the only sanctioned mutator of the
//! `tasks`/`assignments` tables — nothing else in the workspace writes them
//! directly.

mod transition;

use beehive_bus::{MessageBus, SendMessageOptions};
use beehive_shared::errors::{BeehiveError, BeehiveResult};
use beehive_shared::model::{
    ActivityType, Assignment, AssignmentRole, AssignmentStatus, BeeName, DependencyType,
    MessagePriority, MessageType, Priority, Task, TaskStatus,
};
use beehive_store::Store;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

pub use transition::TRANSITION_TABLE;

/// Optional fields for [`TaskEngine::create_task`].
#[derive(Debug, Clone, Default)]
pub struct CreateTaskOptions {
    pub priority: Option<Priority>,
    pub assignee: Option<BeeName>,
    pub parent: Option<Uuid>,
    pub dependencies: Vec<Uuid>,
    pub requirements: Option<Vec<String>>,
    pub metadata: Option<Value>,
}

/// Optional fields for [`TaskEngine::assign`].
#[derive(Debug, Clone)]
pub struct AssignOptions {
    pub assigner: String,
    pub role: AssignmentRole,
    pub note: Option<String>,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            assigner: BeeName::System.to_string(),
            role: AssignmentRole::Primary,
            note: None,
        }
    }
}

/// Optional fields for [`TaskEngine::transition`].
#[derive(Debug, Clone)]
pub struct TransitionOptions {
    pub actor: String,
    pub note: Option<String>,
}

impl Default for TransitionOptions {
    fn default() -> Self {
        Self {
            actor: BeeName::System.to_string(),
            note: None,
        }
    }
}

/// `get_progress(Some(task_id))`.
#[derive(Debug, Clone)]
pub struct Progress {
    pub task: Task,
    pub assignee: Option<BeeName>,
    pub recent_activity: Vec<beehive_shared::model::ActivityEntry>,
}

/// `get_progress(None)`.
#[derive(Debug, Clone, Default)]
pub struct ProgressSummary {
    pub by_status: std::collections::HashMap<TaskStatus, usize>,
    pub by_assignee: std::collections::HashMap<BeeName, usize>,
}

pub struct TaskEngine {
    store: Store,
    bus: MessageBus,
}

impl TaskEngine {
    pub fn new(store: Store, bus: MessageBus) -> Self {
        Self { store, bus }
    }

    /// §4.E `create_task`: validates non-empty title/description, inserts
    /// the row in `pending`, wires up `dependencies`, appends a `created`
    /// activity entry, and performs an initial `assign` if `assignee` is set.
    pub async fn create_task(
        &self,
        title: String,
        description: String,
        created_by: String,
        opts: CreateTaskOptions,
    ) -> BeehiveResult<Uuid> {
        if title.trim().is_empty() {
            return Err(BeehiveError::Validation("task title must not be empty".to_string()));
        }
        if description.trim().is_empty() {
            return Err(BeehiveError::Validation(
                "task description must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let task_id = Uuid::new_v4();
        let task = Task {
            task_id,
            title,
            description,
            status: TaskStatus::Pending,
            priority: opts.priority.unwrap_or(Priority::Medium),
            assigned_to: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            created_by: created_by.clone(),
            parent_task_id: opts.parent,
            metadata: merge_requirements(opts.metadata, opts.requirements),
        };
        self.store.create_task(&task).await?;

        for dependency in &opts.dependencies {
            self.store
                .add_dependency(task_id, *dependency, DependencyType::Blocks)
                .await?;
        }

        self.store
            .append_activity(
                task_id,
                actor_bee_name(&created_by),
                ActivityType::Created,
                "task created",
                None,
                None,
                now,
            )
            .await?;

        if let Some(assignee) = opts.assignee {
            self.assign(
                task_id,
                assignee,
                AssignOptions {
                    assigner: created_by,
                    ..AssignOptions::default()
                },
            )
            .await?;
        }

        Ok(task_id)
    }

    /// §4.E `assign`: updates `tasks.assigned_to`, inserts an Assignment
    /// row, appends an `assignment_change` activity entry. Rejects a second
    /// primary assignment unless the existing one has already been
    /// superseded.
    pub async fn assign(&self, task_id: Uuid, assignee: BeeName, opts: AssignOptions) -> BeehiveResult<()> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(BeehiveError::TaskNotFound(task_id))?;

        if !assignee.is_real_bee() {
            return Err(BeehiveError::InvalidAssignee(assignee.to_string()));
        }

        if opts.role == AssignmentRole::Primary {
            if let Some(existing) = self.store.active_primary_assignment(task_id).await? {
                if existing.assignee != assignee {
                    return Err(BeehiveError::AlreadyAssigned { task_id });
                }
            }
        }

        let now = Utc::now();
        let assignment = Assignment {
            assignment_id: Uuid::new_v4(),
            task_id,
            assignee,
            assigner: opts.assigner,
            assigned_at: now,
            accepted_at: None,
            completed_at: None,
            role: opts.role,
            status: AssignmentStatus::Active,
        };
        self.store.create_assignment(&assignment).await?;

        if opts.role == AssignmentRole::Primary {
            self.store.set_assignee(task_id, Some(assignee), now).await?;
        }

        self.store
            .append_activity(
                task_id,
                Some(assignee),
                ActivityType::AssignmentChange,
                opts.note.as_deref().unwrap_or("assignment changed"),
                task.assigned_to.map(|b| b.to_string()).as_deref(),
                Some(assignee.as_str()),
                now,
            )
            .await?;

        Ok(())
    }

    /// §4.E `transition`: validates the from→to edge against
    /// [`TRANSITION_TABLE`], checks blocking dependencies for `pending →
    /// in_progress`, stamps `started_at`/`completed_at`, appends activity,
    /// and on `completed`/`failed` enqueues the spec's notification via the
    /// Message Bus.
    pub async fn transition(
        &self,
        task_id: Uuid,
        new_status: TaskStatus,
        opts: TransitionOptions,
    ) -> BeehiveResult<()> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(BeehiveError::TaskNotFound(task_id))?;

        if task.status == new_status {
            return Err(BeehiveError::NoOpTransition {
                task_id,
                status: new_status.to_string(),
            });
        }

        if !transition::is_allowed(task.status, new_status) {
            return Err(BeehiveError::IllegalTransition {
                task_id,
                from: task.status.to_string(),
                to: new_status.to_string(),
            });
        }

        if new_status == TaskStatus::InProgress {
            let blockers = self.store.unmet_blockers(task_id).await?;
            if !blockers.is_empty() {
                return Err(BeehiveError::DependencyUnmet {
                    task_id,
                    to: new_status.to_string(),
                    blockers,
                });
            }
        }

        let now = Utc::now();
        self.store.set_status(task_id, new_status, now).await?;
        tracing::info!(%task_id, from = %task.status, to = %new_status, "task transitioned");
        self.store
            .append_activity(
                task_id,
                actor_bee_name(&opts.actor),
                ActivityType::StatusChange,
                opts.note.as_deref().unwrap_or("status changed"),
                Some(task.status.as_str()),
                Some(new_status.as_str()),
                now,
            )
            .await?;

        match new_status {
            TaskStatus::Completed => {
                self.bus
                    .send(
                        BeeName::System,
                        BeeName::Queen,
                        MessageType::TaskUpdate,
                        Some("task completed".to_string()),
                        format!("task {task_id} ({}) is complete", task.title),
                        SendMessageOptions {
                            task_id: Some(task_id),
                            ..SendMessageOptions::default()
                        },
                    )
                    .await?;
            }
            TaskStatus::Failed => {
                self.bus
                    .send(
                        BeeName::System,
                        BeeName::Queen,
                        MessageType::Alert,
                        Some("task failed".to_string()),
                        format!("task {task_id} ({}) failed", task.title),
                        SendMessageOptions {
                            task_id: Some(task_id),
                            priority: MessagePriority::High,
                            ..SendMessageOptions::default()
                        },
                    )
                    .await?;
            }
            _ => {}
        }

        Ok(())
    }

    /// §4.E `get_progress(Some(task_id))`.
    pub async fn progress(&self, task_id: Uuid) -> BeehiveResult<Progress> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(BeehiveError::TaskNotFound(task_id))?;
        let mut recent_activity = self.store.list_activity(task_id).await?;
        recent_activity.reverse();
        recent_activity.truncate(10);

        Ok(Progress {
            assignee: task.assigned_to,
            task,
            recent_activity,
        })
    }

    /// §4.E `get_progress(None)`: aggregate counts per status and assignee
    /// across every task.
    pub async fn progress_summary(&self) -> BeehiveResult<ProgressSummary> {
        let tasks = self.store.list_tasks(None, None).await?;
        let mut summary = ProgressSummary::default();
        for task in tasks {
            *summary.by_status.entry(task.status).or_insert(0) += 1;
            if let Some(assignee) = task.assigned_to {
                *summary.by_assignee.entry(assignee).or_insert(0) += 1;
            }
        }
        Ok(summary)
    }

    /// §4.E `cancel`: shorthand for `transition(id, cancelled, …)`, then
    /// recursively cancels every descendant subtask still in a
    /// non-terminal status.
    pub async fn cancel(&self, task_id: Uuid, actor: String, reason: String) -> BeehiveResult<()> {
        self.transition(
            task_id,
            TaskStatus::Cancelled,
            TransitionOptions {
                actor: actor.clone(),
                note: Some(reason.clone()),
            },
        )
        .await?;

        for child in self.store.list_children(task_id).await? {
            if !child.status.is_terminal() {
                Box::pin(self.cancel(child.task_id, actor.clone(), reason.clone())).await?;
            }
        }
        Ok(())
    }
}

/// `actor`/`created_by` are free-form strings at the API boundary (the
/// Beekeeper or a CLI flag may pass anything); only stamp `bee_name` on the
/// activity row when it happens to name a real bee.
fn actor_bee_name(actor: &str) -> Option<BeeName> {
    use std::str::FromStr;
    BeeName::from_str(actor).ok().filter(|b| b.is_real_bee())
}

/// `requirements` has no dedicated column on `tasks` (§3's Task entity
/// treats `metadata` as the sole opaque blob); fold it into `metadata` under
/// a `requirements` key rather than widen the schema.
fn merge_requirements(metadata: Option<Value>, requirements: Option<Vec<String>>) -> Value {
    let Some(requirements) = requirements else {
        return metadata.unwrap_or(Value::Null);
    };

    let mut metadata = match metadata {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => serde_json::Map::new(),
        Some(other) => {
            let mut map = serde_json::Map::new();
            map.insert("metadata".to_string(), other);
            map
        }
    };
    metadata.insert("requirements".to_string(), Value::from(requirements));
    Value::Object(metadata)
}
