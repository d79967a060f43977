//! `status` (§6): bee liveness and task counts at a glance.

use beehive_shared::BeehiveConfig;

use crate::hive::Hive;
use crate::output;

pub(crate) async fn handle_status(config: BeehiveConfig) -> anyhow::Result<()> {
    let hive = Hive::connect(config).await?;

    output::header(format!("hive \"{}\"", hive.config.session_name));
    for state in hive.store.list_agent_states().await? {
        let alive = state.status != beehive_shared::model::AgentStatus::Offline;
        output::status_icon(
            alive,
            format!(
                "{} — {} (workload {}, last activity {})",
                state.bee_name, state.status, state.workload_score, state.last_activity
            ),
        );
    }

    output::blank();
    let summary = hive.engine.progress_summary().await?;
    output::header("tasks");
    for (status, count) in &summary.by_status {
        output::label(format!("  {status}"), *count);
    }

    Ok(())
}
