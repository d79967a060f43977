//! `task <subcommand>` (§6): a thin wrapper exposing Task Engine and
//! Message Bus operations to the beekeeper and to bees replying through the
//! sanctioned CLI path.

use std::str::FromStr;

use beehive_bus::SendMessageOptions;
use beehive_engine::{AssignOptions, CreateTaskOptions, TransitionOptions};
use beehive_shared::model::{AssignmentRole, BeeName, MessageType, Priority, TaskStatus};
use beehive_shared::BeehiveConfig;
use uuid::Uuid;

use crate::hive::Hive;
use crate::output;
use crate::TaskCommands;

pub(crate) async fn handle_task_command(config: BeehiveConfig, cmd: TaskCommands) -> anyhow::Result<()> {
    let hive = Hive::connect(config).await?;

    match cmd {
        TaskCommands::List { status, assignee } => {
            let status = status.as_deref().map(TaskStatus::from_str).transpose()?;
            let assignee = assignee.as_deref().map(BeeName::from_str).transpose()?;
            let tasks = hive.store.list_tasks(status, assignee).await?;

            output::header(format!("{} task(s)", tasks.len()));
            for task in tasks {
                output::item(format!("{} — {}", task.task_id, task.title));
                output::plain(format!(
                    "    status: {} | priority: {} | assignee: {}",
                    task.status,
                    task.priority,
                    task.assigned_to.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string())
                ));
            }
        }
        TaskCommands::Details { task_id } => {
            let task_id = parse_task_id(&task_id)?;
            let progress = hive.engine.progress(task_id).await?;

            output::header(format!("task {task_id}"));
            output::label("  Title", &progress.task.title);
            output::label("  Status", progress.task.status);
            output::label("  Priority", progress.task.priority);
            output::label(
                "  Assignee",
                progress.assignee.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string()),
            );
            output::label("  Created", progress.task.created_at);
            output::blank();
            output::plain("  Recent activity:");
            for entry in progress.recent_activity {
                output::item(format!("{} — {}", entry.activity_type, entry.description));
            }
        }
        TaskCommands::Create {
            title,
            description,
            priority,
            assignee,
            parent,
            dependencies,
            requirements,
        } => {
            let priority = Priority::from_str(&priority)?;
            let assignee = assignee.as_deref().map(BeeName::from_str).transpose()?;
            let parent = parent.as_deref().map(parse_task_id).transpose()?;
            let dependencies = dependencies
                .iter()
                .map(|d| parse_task_id(d))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let requirements = (!requirements.is_empty()).then_some(requirements);

            let task_id = hive
                .engine
                .create_task(
                    title,
                    description,
                    BeeName::Beekeeper.to_string(),
                    CreateTaskOptions {
                        priority: Some(priority),
                        assignee,
                        parent,
                        dependencies,
                        requirements,
                        metadata: None,
                    },
                )
                .await?;

            output::success(format!("created task {task_id}"));
        }
        TaskCommands::Assign {
            task_id,
            assignee,
            role,
            note,
        } => {
            let task_id = parse_task_id(&task_id)?;
            let assignee = BeeName::from_str(&assignee)?;
            let role = AssignmentRole::from_str(&role).map_err(|_| anyhow::anyhow!("unrecognized assignment role: {role}"))?;

            hive.engine
                .assign(
                    task_id,
                    assignee,
                    AssignOptions {
                        assigner: BeeName::Beekeeper.to_string(),
                        role,
                        note,
                    },
                )
                .await?;

            output::success(format!("assigned task {task_id} to {assignee}"));
        }
        TaskCommands::Status { task_id, status, note } => {
            let task_id = parse_task_id(&task_id)?;
            let status = TaskStatus::from_str(&status)?;

            hive.engine
                .transition(
                    task_id,
                    status,
                    TransitionOptions {
                        actor: BeeName::Beekeeper.to_string(),
                        note,
                    },
                )
                .await?;

            output::success(format!("task {task_id} is now {status}"));
        }
        TaskCommands::Message {
            task_id,
            from,
            to,
            message_type,
            subject,
            content,
        } => {
            let task_id = task_id.as_deref().map(parse_task_id).transpose()?;
            let from = BeeName::from_str(&from)?;
            let to = BeeName::from_str(&to)?;
            let message_type = MessageType::from_str(&message_type).expect("MessageType::from_str is infallible");

            let ids = hive
                .bus
                .send(
                    from,
                    to,
                    message_type,
                    subject,
                    content,
                    SendMessageOptions {
                        task_id,
                        ..SendMessageOptions::default()
                    },
                )
                .await?;

            output::success(format!("sent message(s) {ids:?} from {from} to {to}"));
        }
        TaskCommands::Stats => {
            let summary = hive.engine.progress_summary().await?;

            output::header("tasks by status");
            for status in [
                TaskStatus::Pending,
                TaskStatus::InProgress,
                TaskStatus::Completed,
                TaskStatus::Failed,
                TaskStatus::Cancelled,
            ] {
                output::label(format!("  {status}"), summary.by_status.get(&status).copied().unwrap_or(0));
            }

            output::blank();
            output::header("tasks by assignee");
            for bee in BeeName::REAL_BEES {
                output::label(format!("  {bee}"), summary.by_assignee.get(&bee).copied().unwrap_or(0));
            }
        }
    }

    Ok(())
}

fn parse_task_id(s: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| anyhow::anyhow!("invalid task id {s}: {e}"))
}
