//! Agent state upsert/read (§4.C) — the table the supervisor's liveness
//! classification and the `agent_workload` view both read from.

use beehive_shared::errors::BeehiveResult;
use beehive_shared::model::{AgentState, BeeName};

use crate::rows::AgentStateRow;
use crate::Store;

impl Store {
    pub async fn upsert_agent_state(&self, state: &AgentState) -> BeehiveResult<()> {
        let capabilities = serde_json::to_string(&state.capabilities).unwrap_or_else(|_| "[]".to_string());
        Store::with_retry(|| {
            sqlx::query(
                "INSERT INTO agent_states (bee_name, status, current_task_id, last_activity,
                    last_heartbeat, workload_score, performance_score, capabilities)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT (bee_name) DO UPDATE SET
                    status = excluded.status,
                    current_task_id = excluded.current_task_id,
                    last_activity = excluded.last_activity,
                    last_heartbeat = excluded.last_heartbeat,
                    workload_score = excluded.workload_score,
                    performance_score = excluded.performance_score,
                    capabilities = excluded.capabilities",
            )
            .bind(state.bee_name.as_str())
            .bind(state.status.as_str())
            .bind(state.current_task_id.map(|t| t.to_string()))
            .bind(state.last_activity)
            .bind(state.last_heartbeat)
            .bind(state.workload_score as i64)
            .bind(state.performance_score as i64)
            .bind(&capabilities)
            .execute(self.pool())
        })
        .await?;
        Ok(())
    }

    pub async fn get_agent_state(&self, bee_name: BeeName) -> BeehiveResult<Option<AgentState>> {
        let row: Option<AgentStateRow> = Store::with_retry(|| {
            sqlx::query_as("SELECT * FROM agent_states WHERE bee_name = ?")
                .bind(bee_name.as_str())
                .fetch_optional(self.pool())
        })
        .await?;

        row.map(AgentStateRow::into_agent_state).transpose()
    }

    pub async fn list_agent_states(&self) -> BeehiveResult<Vec<AgentState>> {
        let rows: Vec<AgentStateRow> = Store::with_retry(|| {
            sqlx::query_as("SELECT * FROM agent_states ORDER BY bee_name ASC")
                .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter().map(AgentStateRow::into_agent_state).collect()
    }

    /// Stamp `last_heartbeat` (and `last_activity`) for `bee_name`, leaving
    /// every other column untouched — the supervisor's heartbeat-accept path.
    pub async fn record_heartbeat(
        &self,
        bee_name: BeeName,
        now: chrono::DateTime<chrono::Utc>,
    ) -> BeehiveResult<()> {
        Store::with_retry(|| {
            sqlx::query("UPDATE agent_states SET last_heartbeat = ?, last_activity = ? WHERE bee_name = ?")
                .bind(now)
                .bind(now)
                .bind(bee_name.as_str())
                .execute(self.pool())
        })
        .await?;
        Ok(())
    }

    /// Set `status` alone, leaving every timestamp untouched — the
    /// supervisor's liveness-downgrade and heartbeat-upgrade writes (§4.F
    /// duties 1 and 5).
    pub async fn set_agent_status(&self, bee_name: BeeName, status: AgentStatus) -> BeehiveResult<()> {
        Store::with_retry(|| {
            sqlx::query("UPDATE agent_states SET status = ? WHERE bee_name = ?")
                .bind(status.as_str())
                .bind(bee_name.as_str())
                .execute(self.pool())
        })
        .await?;
        Ok(())
    }

    /// Stamp `last_activity` only — the Message Bus's "touch on send/receive"
    /// update (§4.D.6), distinct from a heartbeat.
    pub async fn touch_activity(
        &self,
        bee_name: BeeName,
        now: chrono::DateTime<chrono::Utc>,
    ) -> BeehiveResult<()> {
        Store::with_retry(|| {
            sqlx::query("UPDATE agent_states SET last_activity = ? WHERE bee_name = ?")
                .bind(now)
                .bind(bee_name.as_str())
                .execute(self.pool())
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use beehive_shared::model::AgentStatus;
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = Store::connect_in_memory().await.unwrap();
        let now = Utc::now();
        store
            .upsert_agent_state(&AgentState {
                bee_name: BeeName::Developer,
                status: AgentStatus::Busy,
                current_task_id: None,
                last_activity: now,
                last_heartbeat: now,
                workload_score: 42,
                performance_score: 90,
                capabilities: vec!["rust".to_string()],
            })
            .await
            .unwrap();

        let state = store.get_agent_state(BeeName::Developer).await.unwrap().unwrap();
        assert_eq!(state.status, AgentStatus::Busy);
        assert_eq!(state.workload_score, 42);
        assert_eq!(state.capabilities, vec!["rust".to_string()]);
    }

    #[tokio::test]
    async fn record_heartbeat_updates_timestamps_only() {
        let store = Store::connect_in_memory().await.unwrap();
        let before = store.get_agent_state(BeeName::Queen).await.unwrap().unwrap();

        let later = before.last_heartbeat + chrono::Duration::seconds(30);
        store.record_heartbeat(BeeName::Queen, later).await.unwrap();

        let after = store.get_agent_state(BeeName::Queen).await.unwrap().unwrap();
        assert_eq!(after.last_heartbeat, later);
        assert_eq!(after.status, before.status);
    }

    #[tokio::test]
    async fn touch_activity_leaves_heartbeat_untouched() {
        let store = Store::connect_in_memory().await.unwrap();
        let before = store.get_agent_state(BeeName::Analyst).await.unwrap().unwrap();

        let later = before.last_activity + chrono::Duration::seconds(10);
        store.touch_activity(BeeName::Analyst, later).await.unwrap();

        let after = store.get_agent_state(BeeName::Analyst).await.unwrap().unwrap();
        assert_eq!(after.last_activity, later);
        assert_eq!(after.last_heartbeat, before.last_heartbeat);
    }

    #[tokio::test]
    async fn set_agent_status_leaves_timestamps_untouched() {
        let store = Store::connect_in_memory().await.unwrap();
        let before = store.get_agent_state(BeeName::Qa).await.unwrap().unwrap();

        store.set_agent_status(BeeName::Qa, AgentStatus::Offline).await.unwrap();

        let after = store.get_agent_state(BeeName::Qa).await.unwrap().unwrap();
        assert_eq!(after.status, AgentStatus::Offline);
        assert_eq!(after.last_heartbeat, before.last_heartbeat);
        assert_eq!(after.last_activity, before.last_activity);
    }
}
