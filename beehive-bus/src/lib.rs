//! # beehive-bus
//!
//! The Message Bus (§4.D): the protocol-level contract every inter-bee
//! exchange goes through. Built atop [`beehive_store::Store`] and
//! [`beehive_mux::Injector`]; nothing else in the workspace is allowed to
//! enqueue a row into `messages` directly.

mod wire;

use beehive_mux::{Injector, PaneTable, SendOptions};
use beehive_shared::errors::{BeehiveError, BeehiveResult};
use beehive_shared::model::{BeeName, Message, MessagePriority, MessageType};
use chrono::Utc;
use uuid::Uuid;

/// Optional fields for [`MessageBus::send`]; everything here has a spec
/// default so most call sites only set `task_id` or `priority`.
#[derive(Debug, Clone, Default)]
pub struct SendMessageOptions {
    pub task_id: Option<Uuid>,
    pub priority: MessagePriority,
    /// Share an existing conversation rather than start a new one; used by
    /// replies (`reply_to` threads through the same conversation).
    pub correlate: Option<Uuid>,
    pub reply_to: Option<i64>,
    pub expires_at: Option<chrono::DateTime<Utc>>,
}

/// Filters for [`MessageBus::receive`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiveOptions {
    pub include_processed: bool,
    pub max: Option<usize>,
}

pub struct MessageBus {
    store: beehive_store::Store,
    injector: Injector,
    session: String,
}

impl MessageBus {
    pub fn new(store: beehive_store::Store, injector: Injector, session: impl Into<String>) -> Self {
        Self {
            store,
            injector,
            session: session.into(),
        }
    }

    /// §4.D `send`. `to = all` expands into one message per real bee other
    /// than `from`, sharing a single `conversation_id`; every other `to`
    /// is a single message. Returns the assigned message id(s) — one per
    /// recipient, in send order.
    pub async fn send(
        &self,
        from: BeeName,
        to: BeeName,
        message_type: MessageType,
        subject: Option<String>,
        content: String,
        opts: SendMessageOptions,
    ) -> BeehiveResult<Vec<i64>> {
        PaneTable::validate(to)?;
        if from.is_broadcast() {
            return Err(BeehiveError::Validation(
                "`all` is never a valid sender".to_string(),
            ));
        }

        let recipients = if to.is_broadcast() {
            BeeName::REAL_BEES
                .into_iter()
                .filter(|&bee| bee != from)
                .collect::<Vec<_>>()
        } else {
            vec![to]
        };

        let conversation_id = opts.correlate.or_else(|| {
            if recipients.len() > 1 {
                Some(Uuid::new_v4())
            } else {
                None
            }
        });

        let mut message_ids = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let id = self
                .send_one(
                    from,
                    recipient,
                    &message_type,
                    subject.as_deref(),
                    &content,
                    &opts,
                    conversation_id,
                )
                .await?;
            message_ids.push(id);
        }
        Ok(message_ids)
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_one(
        &self,
        from: BeeName,
        to: BeeName,
        message_type: &MessageType,
        subject: Option<&str>,
        content: &str,
        opts: &SendMessageOptions,
        conversation_id: Option<Uuid>,
    ) -> BeehiveResult<i64> {
        let now = Utc::now();
        let message = Message {
            message_id: 0,
            from_bee: from,
            to_bee: to,
            message_type: message_type.clone(),
            subject: subject.map(str::to_string),
            content: content.to_string(),
            task_id: opts.task_id,
            priority: opts.priority,
            processed: false,
            processed_at: None,
            created_at: now,
            expires_at: opts.expires_at,
            reply_to: opts.reply_to,
            sender_cli_used: true,
            conversation_id,
        };
        let message_id = self.store.enqueue_message(&message).await?;

        let payload = wire::format_payload(from, message_type, subject, opts.task_id, now, content);
        let send_options = SendOptions {
            message_type: message_type.as_str().to_string(),
            sender: from.to_string(),
            metadata: serde_json::json!({ "message_id": message_id }),
            dry_run: false,
        };
        self.injector.send(&self.session, to, &payload, send_options).await?;

        if from.is_real_bee() {
            self.store.touch_activity(from, now).await?;
        }
        if to.is_real_bee() {
            self.store.touch_activity(to, now).await?;
        }

        Ok(message_id)
    }

    /// §4.D `receive`: dequeued-but-not-consumed messages for `bee`. The
    /// caller is responsible for [`MessageBus::ack`].
    pub async fn receive(&self, bee: BeeName, opts: ReceiveOptions) -> BeehiveResult<Vec<Message>> {
        let now = Utc::now();
        let mut messages = self.store.dequeue_for(bee, now).await?;
        if !opts.include_processed {
            messages.retain(|m| !m.processed);
        }
        if let Some(max) = opts.max {
            messages.truncate(max);
        }
        Ok(messages)
    }

    /// §4.D `ack` (alias `mark_processed`); idempotent — acking an
    /// already-processed message is a no-op rather than an error.
    pub async fn ack(&self, message_id: i64) -> BeehiveResult<()> {
        match self.store.get_message(message_id).await? {
            Some(message) if message.processed => Ok(()),
            Some(_) => self.store.mark_processed(message_id, Utc::now()).await,
            None => Err(BeehiveError::Validation(format!(
                "no message with id {message_id}"
            ))),
        }
    }

    pub fn store(&self) -> &beehive_store::Store {
        &self.store
    }
}
