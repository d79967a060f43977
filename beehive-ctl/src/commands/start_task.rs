//! `start-task "<text>"` (§6): create a task assigned to the queen and
//! notify via the Message Bus. Exit 0 on success, 2 if the session is not
//! running.

use beehive_engine::CreateTaskOptions;
use beehive_shared::model::{AgentStatus, BeeName};
use beehive_shared::BeehiveConfig;

use crate::hive::Hive;
use crate::output;

pub(crate) async fn handle_start_task(config: BeehiveConfig, text: String) -> anyhow::Result<()> {
    let hive = Hive::connect(config).await?;

    let queen = hive.store.get_agent_state(BeeName::Queen).await?;
    if queen.map(|s| s.status) == Some(AgentStatus::Offline) {
        output::warning("the queen is offline — run `beehive-ctl init` first");
        std::process::exit(2);
    }

    let title: String = text.chars().take(80).collect();
    let task_id = hive
        .engine
        .create_task(
            title,
            text,
            BeeName::Beekeeper.to_string(),
            CreateTaskOptions {
                assignee: Some(BeeName::Queen),
                ..CreateTaskOptions::default()
            },
        )
        .await?;

    output::success(format!("task {task_id} created and assigned to queen"));
    Ok(())
}
