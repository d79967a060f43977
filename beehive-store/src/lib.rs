//! # beehive-store
//!
//! The durable transactional store behind the coordination substrate: a
//! single SQLite file holding tasks, dependencies, assignments, messages,
//! agent state, and the two append-only logs (§3, §4.C).
//!
//! Every public operation returns `BeehiveResult<T>`. Transient SQLite
//! faults (`SQLITE_BUSY`, `SQLITE_LOCKED`) are retried internally with
//! bounded exponential backoff before surfacing as `StoreUnavailable`;
//! anything else surfaces immediately.

mod activity;
mod agents;
mod assignments;
mod dependencies;
mod injection;
mod messages;
mod rows;
mod tasks;
mod views;

use std::path::Path;
use std::time::Duration;

use beehive_shared::errors::{BeehiveError, BeehiveResult};
use beehive_shared::model::{AgentState, AgentStatus, BeeName};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub use views::{ActiveTaskSummary, AgentWorkloadSummary};

const MAX_RETRIES: u32 = 5;
const BASE_BACKOFF_MS: u64 = 20;

/// Handle to the hive's SQLite database. Cheap to clone (wraps a pool).
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if absent) the database at `path`, run pending
    /// migrations, and seed one [`AgentState`] row per
    /// [`BeeName::REAL_BEES`] if the `agent_states` table is empty.
    pub async fn connect(path: &Path, timeout: Duration) -> BeehiveResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| BeehiveError::StoreUnavailable(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| BeehiveError::StoreIntegrity(format!("migration failed: {e}")))?;

        let store = Self { pool };
        store.seed_agent_states().await?;
        Ok(store)
    }

    /// In-memory database, for tests: migrations run, agent states seeded.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn connect_in_memory() -> BeehiveResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BeehiveError::StoreUnavailable(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| BeehiveError::StoreIntegrity(format!("migration failed: {e}")))?;

        let store = Self { pool };
        store.seed_agent_states().await?;
        Ok(store)
    }

    async fn seed_agent_states(&self) -> BeehiveResult<()> {
        let now = Utc::now();
        for bee in BeeName::REAL_BEES {
            let existing = self.get_agent_state(bee).await?;
            if existing.is_none() {
                self.upsert_agent_state(&AgentState {
                    bee_name: bee,
                    status: AgentStatus::Idle,
                    current_task_id: None,
                    last_activity: now,
                    last_heartbeat: now,
                    workload_score: 0,
                    performance_score: 0,
                    capabilities: Vec::new(),
                })
                .await?;
            }
        }
        Ok(())
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run `op` with bounded retry-with-backoff when it reports a transient
    /// fault (`sqlx::Error::Database` with a busy/locked SQLite code). Any
    /// other error, or exhaustion of `MAX_RETRIES`, surfaces as
    /// `StoreUnavailable`.
    pub(crate) async fn with_retry<T, F, Fut>(op: F) -> BeehiveResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && attempt < MAX_RETRIES => {
                    let backoff = BASE_BACKOFF_MS * 2u64.pow(attempt) + fastrand::u64(0..10);
                    tracing::debug!(attempt, backoff_ms = backoff, "retrying transient store fault");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
                Err(err) if is_transient(&err) => {
                    return Err(BeehiveError::StoreUnavailable(format!(
                        "exhausted {MAX_RETRIES} retries: {err}"
                    )));
                }
                Err(err) => return Err(map_sqlx_error(err)),
            }
        }
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|c| c == "5" || c == "6") // SQLITE_BUSY / SQLITE_LOCKED
            .unwrap_or(false),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> BeehiveError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_check_violation() || db_err.is_foreign_key_violation() => {
            BeehiveError::StoreIntegrity(db_err.to_string())
        }
        other => BeehiveError::StoreTransient(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_seeds_one_state_per_real_bee() {
        let store = Store::connect_in_memory().await.unwrap();
        for bee in BeeName::REAL_BEES {
            let state = store.get_agent_state(bee).await.unwrap();
            assert!(state.is_some(), "expected seeded state for {bee}");
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = Store::connect_in_memory().await.unwrap();
        store.seed_agent_states().await.unwrap();
        let states = store.list_agent_states().await.unwrap();
        assert_eq!(states.len(), 4);
    }
}
