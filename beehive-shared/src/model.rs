//! # Data Model
//!
//! The entities of the coordination substrate: bees, tasks, dependencies,
//! assignments, messages, agent state, and the two append-only logs.
//!
//! Every type here is a plain serde-able value; none of them know how to
//! persist themselves. That is `beehive-store`'s job.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of names a message or task assignment can carry.
///
/// `System` and `Beekeeper` are synthetic senders — they never get a pane
/// or an `AgentState` row. `All` is a broadcast target only; it is never
/// a valid sender and never a valid `assigned_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeeName {
    Queen,
    Developer,
    Qa,
    Analyst,
    System,
    Beekeeper,
    All,
}

impl BeeName {
    /// The four bees that have a dedicated pane and an `AgentState` row.
    pub const REAL_BEES: [BeeName; 4] = [
        BeeName::Queen,
        BeeName::Developer,
        BeeName::Qa,
        BeeName::Analyst,
    ];

    /// True for the four hosted LLM CLI processes (as opposed to the
    /// synthetic `system`/`beekeeper` senders and the `all` broadcast target).
    pub fn is_real_bee(self) -> bool {
        matches!(
            self,
            BeeName::Queen | BeeName::Developer | BeeName::Qa | BeeName::Analyst
        )
    }

    pub fn is_broadcast(self) -> bool {
        matches!(self, BeeName::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BeeName::Queen => "queen",
            BeeName::Developer => "developer",
            BeeName::Qa => "qa",
            BeeName::Analyst => "analyst",
            BeeName::System => "system",
            BeeName::Beekeeper => "beekeeper",
            BeeName::All => "all",
        }
    }
}

impl fmt::Display for BeeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BeeName {
    type Err = InvalidBeeName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queen" => Ok(BeeName::Queen),
            "developer" => Ok(BeeName::Developer),
            "qa" => Ok(BeeName::Qa),
            "analyst" => Ok(BeeName::Analyst),
            "system" => Ok(BeeName::System),
            "beekeeper" => Ok(BeeName::Beekeeper),
            "all" => Ok(BeeName::All),
            other => Err(InvalidBeeName(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("not a recognized bee name: {0}")]
pub struct InvalidBeeName(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = InvalidTaskStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(InvalidTaskStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("not a recognized task status: {0}")]
pub struct InvalidTaskStatus(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = InvalidPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(InvalidPriority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("not a recognized priority: {0}")]
pub struct InvalidPriority(pub String);

/// A unit of delegated work. See `spec.md` §3 for the full invariant list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assigned_to: Option<BeeName>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub parent_task_id: Option<Uuid>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Blocks,
    Related,
    Subtask,
}

impl DependencyType {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyType::Blocks => "blocks",
            DependencyType::Related => "related",
            DependencyType::Subtask => "subtask",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = InvalidDependencyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blocks" => Ok(DependencyType::Blocks),
            "related" => Ok(DependencyType::Related),
            "subtask" => Ok(DependencyType::Subtask),
            other => Err(InvalidDependencyType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("not a recognized dependency type: {0}")]
pub struct InvalidDependencyType(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDependency {
    pub task_id: Uuid,
    pub depends_on_task_id: Uuid,
    pub dependency_type: DependencyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentRole {
    Primary,
    Reviewer,
    Collaborator,
}

impl AssignmentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentRole::Primary => "primary",
            AssignmentRole::Reviewer => "reviewer",
            AssignmentRole::Collaborator => "collaborator",
        }
    }
}

impl fmt::Display for AssignmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentRole {
    type Err = InvalidAssignmentRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(AssignmentRole::Primary),
            "reviewer" => Ok(AssignmentRole::Reviewer),
            "collaborator" => Ok(AssignmentRole::Collaborator),
            other => Err(InvalidAssignmentRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("not a recognized assignment role: {0}")]
pub struct InvalidAssignmentRole(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Accepted,
    Completed,
    Superseded,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Accepted => "accepted",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Superseded => "superseded",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = InvalidAssignmentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AssignmentStatus::Active),
            "accepted" => Ok(AssignmentStatus::Accepted),
            "completed" => Ok(AssignmentStatus::Completed),
            "superseded" => Ok(AssignmentStatus::Superseded),
            other => Err(InvalidAssignmentStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("not a recognized assignment status: {0}")]
pub struct InvalidAssignmentStatus(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub assignment_id: Uuid,
    pub task_id: Uuid,
    pub assignee: BeeName,
    pub assigner: String,
    pub assigned_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub role: AssignmentRole,
    pub status: AssignmentStatus,
}

/// Closed-ish set of message types. The spec allows implementers to extend
/// this via config; `Other` carries any value not in the baked-in set.
///
/// Serialized as its plain string form (via `as_str`/`FromStr`) rather than
/// through derived enum tagging, since `Other` must round-trip arbitrary
/// configured type names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Question,
    Request,
    Response,
    Alert,
    TaskUpdate,
    Instruction,
    Conversation,
    RoleInjection,
    Notification,
    Heartbeat,
    Other(String),
}

impl Serialize for MessageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(MessageType::from_str(&s).expect("MessageType::from_str is infallible"))
    }
}

impl MessageType {
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Info => "info",
            MessageType::Question => "question",
            MessageType::Request => "request",
            MessageType::Response => "response",
            MessageType::Alert => "alert",
            MessageType::TaskUpdate => "task_update",
            MessageType::Instruction => "instruction",
            MessageType::Conversation => "conversation",
            MessageType::RoleInjection => "role_injection",
            MessageType::Notification => "notification",
            MessageType::Heartbeat => "heartbeat",
            MessageType::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "info" => MessageType::Info,
            "question" => MessageType::Question,
            "request" => MessageType::Request,
            "response" => MessageType::Response,
            "alert" => MessageType::Alert,
            "task_update" => MessageType::TaskUpdate,
            "instruction" => MessageType::Instruction,
            "conversation" => MessageType::Conversation,
            "role_injection" => MessageType::RoleInjection,
            "notification" => MessageType::Notification,
            "heartbeat" => MessageType::Heartbeat,
            other => MessageType::Other(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for MessagePriority {
    fn default() -> Self {
        MessagePriority::Normal
    }
}

impl MessagePriority {
    pub fn as_str(self) -> &'static str {
        match self {
            MessagePriority::Low => "low",
            MessagePriority::Normal => "normal",
            MessagePriority::High => "high",
            MessagePriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessagePriority {
    type Err = InvalidMessagePriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(MessagePriority::Low),
            "normal" => Ok(MessagePriority::Normal),
            "high" => Ok(MessagePriority::High),
            "urgent" => Ok(MessagePriority::Urgent),
            other => Err(InvalidMessagePriority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("not a recognized message priority: {0}")]
pub struct InvalidMessagePriority(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from_bee: BeeName,
    pub to_bee: BeeName,
    pub message_type: MessageType,
    pub subject: Option<String>,
    pub content: String,
    pub task_id: Option<Uuid>,
    pub priority: MessagePriority,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reply_to: Option<i64>,
    pub sender_cli_used: bool,
    pub conversation_id: Option<Uuid>,
}

impl Message {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp < now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Waiting,
    Offline,
    Error,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Busy => "busy",
            AgentStatus::Waiting => "waiting",
            AgentStatus::Offline => "offline",
            AgentStatus::Error => "error",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = InvalidAgentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AgentStatus::Idle),
            "busy" => Ok(AgentStatus::Busy),
            "waiting" => Ok(AgentStatus::Waiting),
            "offline" => Ok(AgentStatus::Offline),
            "error" => Ok(AgentStatus::Error),
            other => Err(InvalidAgentStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("not a recognized agent status: {0}")]
pub struct InvalidAgentStatus(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub bee_name: BeeName,
    pub status: AgentStatus,
    pub current_task_id: Option<Uuid>,
    pub last_activity: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub workload_score: u8,
    pub performance_score: u8,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Created,
    StatusChange,
    AssignmentChange,
    Note,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Created => "created",
            ActivityType::StatusChange => "status_change",
            ActivityType::AssignmentChange => "assignment_change",
            ActivityType::Note => "note",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit trail entry. Never updated or deleted after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub task_id: Uuid,
    pub bee_name: Option<BeeName>,
    pub activity_type: ActivityType,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionOutcome {
    Delivered,
    PaneNotFound,
    SessionNotFound,
    TransportError,
    DryRun,
}

impl InjectionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            InjectionOutcome::Delivered => "delivered",
            InjectionOutcome::PaneNotFound => "pane_not_found",
            InjectionOutcome::SessionNotFound => "session_not_found",
            InjectionOutcome::TransportError => "transport_error",
            InjectionOutcome::DryRun => "dry_run",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, InjectionOutcome::Delivered | InjectionOutcome::DryRun)
    }
}

impl fmt::Display for InjectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only log of every Injector call, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionLogEntry {
    pub id: i64,
    pub session: String,
    pub pane: String,
    pub payload_hash: String,
    pub message_type: String,
    pub sender: String,
    pub metadata: serde_json::Value,
    pub dry_run: bool,
    pub created_at: DateTime<Utc>,
    pub outcome: InjectionOutcome,
}
