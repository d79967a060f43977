//! Append-only injection log (§4.A, §4.C) — every call the mux's Injector
//! makes, successful or not, lands here for `logs`/`attach` and audit.

use beehive_shared::errors::BeehiveResult;
use beehive_shared::model::InjectionLogEntry;
use chrono::{DateTime, Utc};

use crate::rows::InjectionLogRow;
use crate::Store;

impl Store {
    #[allow(clippy::too_many_arguments)]
    pub async fn append_injection_log(&self, entry: &InjectionLogEntry) -> BeehiveResult<i64> {
        let metadata = serde_json::to_string(&entry.metadata).unwrap_or_else(|_| "{}".to_string());
        let result = Store::with_retry(|| {
            sqlx::query(
                "INSERT INTO injection_log (session, pane, payload_hash, message_type, sender,
                    metadata, dry_run, created_at, outcome)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&entry.session)
            .bind(&entry.pane)
            .bind(&entry.payload_hash)
            .bind(&entry.message_type)
            .bind(&entry.sender)
            .bind(&metadata)
            .bind(entry.dry_run)
            .bind(entry.created_at)
            .bind(entry.outcome.as_str())
            .execute(self.pool())
        })
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent injection log entries for `pane`, newest first — feeds
    /// the CLI's `logs` and `attach` views.
    pub async fn list_injection_log(&self, pane: &str, limit: i64) -> BeehiveResult<Vec<InjectionLogEntry>> {
        let rows: Vec<InjectionLogRow> = Store::with_retry(|| {
            sqlx::query_as(
                "SELECT * FROM injection_log WHERE pane = ? ORDER BY created_at DESC LIMIT ?",
            )
            .bind(pane)
            .bind(limit)
            .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter().map(InjectionLogRow::into_entry).collect()
    }

    /// Injection attempts for `pane` since `since`, used by the supervisor's
    /// rate-limited protocol-violation alerting window (§4.E).
    pub async fn count_injections_since(&self, pane: &str, since: DateTime<Utc>) -> BeehiveResult<i64> {
        let (count,): (i64,) = Store::with_retry(|| {
            sqlx::query_as("SELECT COUNT(*) FROM injection_log WHERE pane = ? AND created_at >= ?")
                .bind(pane)
                .bind(since)
                .fetch_one(self.pool())
        })
        .await?;
        Ok(count)
    }
}
