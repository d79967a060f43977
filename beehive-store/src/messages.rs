//! Message enqueue/dequeue and the `pending_messages` queue semantics (§4.C).

use beehive_shared::errors::{BeehiveError, BeehiveResult};
use beehive_shared::model::{BeeName, Message};
use chrono::{DateTime, Utc};

use crate::rows::MessageRow;
use crate::Store;

impl Store {
    /// Insert `message` (its `message_id` is ignored; the database assigns
    /// one) and return the assigned id.
    pub async fn enqueue_message(&self, message: &Message) -> BeehiveResult<i64> {
        let result = Store::with_retry(|| {
            sqlx::query(
                "INSERT INTO messages (from_bee, to_bee, message_type, subject, content, task_id,
                    priority, processed, processed_at, created_at, expires_at, reply_to,
                    sender_cli_used, conversation_id)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(message.from_bee.as_str())
            .bind(message.to_bee.as_str())
            .bind(message.message_type.as_str())
            .bind(&message.subject)
            .bind(&message.content)
            .bind(message.task_id.map(|t| t.to_string()))
            .bind(message.priority.as_str())
            .bind(message.processed)
            .bind(message.processed_at)
            .bind(message.created_at)
            .bind(message.expires_at)
            .bind(message.reply_to)
            .bind(message.sender_cli_used)
            .bind(message.conversation_id.map(|c| c.to_string()))
            .execute(self.pool())
        })
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Unprocessed, unexpired messages addressed to `to_bee`, oldest highest
    /// priority first — the `pending_messages` view filtered to one bee.
    pub async fn dequeue_for(&self, to_bee: BeeName, now: DateTime<Utc>) -> BeehiveResult<Vec<Message>> {
        let rows: Vec<MessageRow> = Store::with_retry(|| {
            sqlx::query_as(
                "SELECT * FROM pending_messages WHERE to_bee = ? OR to_bee = 'all'",
            )
            .bind(to_bee.as_str())
            .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter()
            .map(MessageRow::into_message)
            .filter(|m| m.as_ref().map(|m| !m.is_expired_at(now)).unwrap_or(true))
            .collect()
    }

    pub async fn mark_processed(&self, message_id: i64, now: DateTime<Utc>) -> BeehiveResult<()> {
        let result = Store::with_retry(|| {
            sqlx::query("UPDATE messages SET processed = 1, processed_at = ? WHERE message_id = ?")
                .bind(now)
                .bind(message_id)
                .execute(self.pool())
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(BeehiveError::Validation(format!(
                "no message with id {message_id}"
            )));
        }
        Ok(())
    }

    pub async fn get_message(&self, message_id: i64) -> BeehiveResult<Option<Message>> {
        let row: Option<MessageRow> = Store::with_retry(|| {
            sqlx::query_as("SELECT * FROM messages WHERE message_id = ?")
                .bind(message_id)
                .fetch_optional(self.pool())
        })
        .await?;

        row.map(MessageRow::into_message).transpose()
    }

    /// All messages sharing `conversation_id`, oldest first — for `logs`
    /// and conversation-threaded CLI views (§6).
    pub async fn list_conversation(&self, conversation_id: uuid::Uuid) -> BeehiveResult<Vec<Message>> {
        let rows: Vec<MessageRow> = Store::with_retry(|| {
            sqlx::query_as("SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC")
                .bind(conversation_id.to_string())
                .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }

    /// Messages inserted since `since` with `sender_cli_used = 0` whose
    /// `from_bee` is one of the four real bees — the supervisor's
    /// protocol-violation scan (§4.F duty 3).
    pub async fn list_protocol_violations_since(&self, since: DateTime<Utc>) -> BeehiveResult<Vec<Message>> {
        let rows: Vec<MessageRow> = Store::with_retry(|| {
            sqlx::query_as(
                "SELECT * FROM messages WHERE sender_cli_used = 0 AND created_at >= ?
                 AND from_bee IN ('queen', 'developer', 'qa', 'analyst')",
            )
            .bind(since)
            .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }

    /// Unprocessed messages older than `expires_at` as of `now` — fed to the
    /// supervisor's reaping pass (§4.E).
    pub async fn list_expired(&self, now: DateTime<Utc>) -> BeehiveResult<Vec<Message>> {
        let rows: Vec<MessageRow> = Store::with_retry(|| {
            sqlx::query_as(
                "SELECT * FROM messages WHERE processed = 0 AND expires_at IS NOT NULL AND expires_at < ?",
            )
            .bind(now)
            .fetch_all(self.pool())
        })
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }
}

#[cfg(test)]
mod tests {
    use beehive_shared::model::{MessagePriority, MessageType};

    use super::*;

    fn sample_message(to_bee: BeeName) -> Message {
        let now = Utc::now();
        Message {
            message_id: 0,
            from_bee: BeeName::Queen,
            to_bee,
            message_type: MessageType::Instruction,
            subject: Some("start".to_string()),
            content: "begin task".to_string(),
            task_id: None,
            priority: MessagePriority::Normal,
            processed: false,
            processed_at: None,
            created_at: now,
            expires_at: None,
            reply_to: None,
            sender_cli_used: true,
            conversation_id: None,
        }
    }

    #[tokio::test]
    async fn enqueue_then_dequeue_round_trips() {
        let store = Store::connect_in_memory().await.unwrap();
        let id = store.enqueue_message(&sample_message(BeeName::Developer)).await.unwrap();
        assert!(id > 0);

        let pending = store.dequeue_for(BeeName::Developer, Utc::now()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].content, "begin task");
    }

    #[tokio::test]
    async fn mark_processed_removes_from_queue() {
        let store = Store::connect_in_memory().await.unwrap();
        let id = store.enqueue_message(&sample_message(BeeName::Qa)).await.unwrap();
        store.mark_processed(id, Utc::now()).await.unwrap();

        let pending = store.dequeue_for(BeeName::Qa, Utc::now()).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn expired_message_excluded_from_dequeue() {
        let store = Store::connect_in_memory().await.unwrap();
        let now = Utc::now();
        let mut msg = sample_message(BeeName::Analyst);
        msg.expires_at = Some(now - chrono::Duration::seconds(60));
        store.enqueue_message(&msg).await.unwrap();

        let pending = store.dequeue_for(BeeName::Analyst, now).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn broadcast_message_reaches_any_bee() {
        let store = Store::connect_in_memory().await.unwrap();
        store.enqueue_message(&sample_message(BeeName::All)).await.unwrap();

        let pending = store.dequeue_for(BeeName::Queen, Utc::now()).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn protocol_violations_excludes_cli_used_and_synthetic_senders() {
        let store = Store::connect_in_memory().await.unwrap();
        let since = Utc::now() - chrono::Duration::seconds(1);

        let mut via_cli = sample_message(BeeName::Developer);
        via_cli.sender_cli_used = true;
        store.enqueue_message(&via_cli).await.unwrap();

        let mut bypass = sample_message(BeeName::Developer);
        bypass.sender_cli_used = false;
        store.enqueue_message(&bypass).await.unwrap();

        let mut synthetic = sample_message(BeeName::Developer);
        synthetic.from_bee = BeeName::System;
        synthetic.sender_cli_used = false;
        store.enqueue_message(&synthetic).await.unwrap();

        let violations = store.list_protocol_violations_since(since).await.unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].from_bee, BeeName::Developer);
    }
}
