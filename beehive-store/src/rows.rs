//! Raw row shapes and their conversion into `beehive_shared::model` types.
//!
//! SQLite has no native enum type, so every closed-set column round-trips
//! through `TEXT` and is parsed on the way out. A malformed value here is a
//! `StoreIntegrity` fault: the schema's `CHECK` constraints should make it
//! unreachable in practice, but `Store` never trusts that blindly.

use std::str::FromStr;

use beehive_shared::errors::{BeehiveError, BeehiveResult};
use beehive_shared::model::*;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) fn parse_field<T>(column: &str, raw: &str) -> BeehiveResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| {
        BeehiveError::StoreIntegrity(format!("column `{column}` holds an invalid value: {e}"))
    })
}

pub(crate) fn parse_uuid(column: &str, raw: &str) -> BeehiveResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| BeehiveError::StoreIntegrity(format!("column `{column}` is not a uuid: {e}")))
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct TaskRow {
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub parent_task_id: Option<String>,
    pub metadata: String,
}

impl TaskRow {
    pub(crate) fn into_task(self) -> BeehiveResult<Task> {
        Ok(Task {
            task_id: parse_uuid("task_id", &self.task_id)?,
            title: self.title,
            description: self.description,
            status: parse_field("status", &self.status)?,
            priority: parse_field("priority", &self.priority)?,
            assigned_to: self
                .assigned_to
                .map(|b| parse_field("assigned_to", &b))
                .transpose()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            created_by: self.created_by,
            parent_task_id: self
                .parent_task_id
                .map(|p| parse_uuid("parent_task_id", &p))
                .transpose()?,
            metadata: serde_json::from_str(&self.metadata).unwrap_or(serde_json::Value::Null),
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct MessageRow {
    pub message_id: i64,
    pub from_bee: String,
    pub to_bee: String,
    pub message_type: String,
    pub subject: Option<String>,
    pub content: String,
    pub task_id: Option<String>,
    pub priority: String,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reply_to: Option<i64>,
    pub sender_cli_used: bool,
    pub conversation_id: Option<String>,
}

impl MessageRow {
    pub(crate) fn into_message(self) -> BeehiveResult<Message> {
        Ok(Message {
            message_id: self.message_id,
            from_bee: parse_field("from_bee", &self.from_bee)?,
            to_bee: parse_field("to_bee", &self.to_bee)?,
            message_type: MessageType::from_str(&self.message_type)
                .expect("MessageType::from_str is infallible"),
            subject: self.subject,
            content: self.content,
            task_id: self
                .task_id
                .map(|t| parse_uuid("task_id", &t))
                .transpose()?,
            priority: parse_field("priority", &self.priority)?,
            processed: self.processed,
            processed_at: self.processed_at,
            created_at: self.created_at,
            expires_at: self.expires_at,
            reply_to: self.reply_to,
            sender_cli_used: self.sender_cli_used,
            conversation_id: self
                .conversation_id
                .map(|c| parse_uuid("conversation_id", &c))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AgentStateRow {
    pub bee_name: String,
    pub status: String,
    pub current_task_id: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub workload_score: i64,
    pub performance_score: i64,
    pub capabilities: String,
}

impl AgentStateRow {
    pub(crate) fn into_agent_state(self) -> BeehiveResult<AgentState> {
        Ok(AgentState {
            bee_name: parse_field("bee_name", &self.bee_name)?,
            status: parse_field("status", &self.status)?,
            current_task_id: self
                .current_task_id
                .map(|t| parse_uuid("current_task_id", &t))
                .transpose()?,
            last_activity: self.last_activity,
            last_heartbeat: self.last_heartbeat,
            workload_score: self.workload_score.clamp(0, 100) as u8,
            performance_score: self.performance_score.clamp(0, 100) as u8,
            capabilities: serde_json::from_str(&self.capabilities).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AssignmentRow {
    pub assignment_id: String,
    pub task_id: String,
    pub assignee: String,
    pub assigner: String,
    pub assigned_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub role: String,
    pub status: String,
}

impl AssignmentRow {
    pub(crate) fn into_assignment(self) -> BeehiveResult<Assignment> {
        Ok(Assignment {
            assignment_id: parse_uuid("assignment_id", &self.assignment_id)?,
            task_id: parse_uuid("task_id", &self.task_id)?,
            assignee: parse_field("assignee", &self.assignee)?,
            assigner: self.assigner,
            assigned_at: self.assigned_at,
            accepted_at: self.accepted_at,
            completed_at: self.completed_at,
            role: parse_field("role", &self.role)?,
            status: parse_field("status", &self.status)?,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ActivityRow {
    pub id: i64,
    pub task_id: String,
    pub bee_name: Option<String>,
    pub activity_type: String,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityRow {
    pub(crate) fn into_activity_entry(self) -> BeehiveResult<ActivityEntry> {
        Ok(ActivityEntry {
            id: self.id,
            task_id: parse_uuid("task_id", &self.task_id)?,
            bee_name: self
                .bee_name
                .map(|b| parse_field("bee_name", &b))
                .transpose()?,
            activity_type: parse_field("activity_type", &self.activity_type)?,
            description: self.description,
            old_value: self.old_value,
            new_value: self.new_value,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct InjectionLogRow {
    pub id: i64,
    pub session: String,
    pub pane: String,
    pub payload_hash: String,
    pub message_type: String,
    pub sender: String,
    pub metadata: String,
    pub dry_run: bool,
    pub created_at: DateTime<Utc>,
    pub outcome: String,
}

impl InjectionLogRow {
    pub(crate) fn into_entry(self) -> BeehiveResult<InjectionLogEntry> {
        Ok(InjectionLogEntry {
            id: self.id,
            session: self.session,
            pane: self.pane,
            payload_hash: self.payload_hash,
            message_type: self.message_type,
            sender: self.sender,
            metadata: serde_json::from_str(&self.metadata).unwrap_or(serde_json::Value::Null),
            dry_run: self.dry_run,
            created_at: self.created_at,
            outcome: parse_field("outcome", &self.outcome)?,
        })
    }
}
