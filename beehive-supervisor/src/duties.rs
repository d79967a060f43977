//! The six per-tick duties of §4.F, each independent: a failure in one
//! duty is logged and does not prevent the others from running.

use std::collections::HashMap;
use std::time::Duration;

use beehive_bus::{MessageBus, ReceiveOptions, SendMessageOptions};
use beehive_mux::{Injector, SendOptions};
use beehive_shared::model::{AgentStatus, BeeName, MessagePriority, MessageType};
use beehive_store::Store;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// `T_idle`/`T_silent` thresholds plus the reminder/violation windows,
/// carried from [`beehive_shared::BeehiveConfig`] rather than re-read per
/// tick.
#[derive(Debug, Clone)]
pub struct SupervisorThresholds {
    pub t_idle: Duration,
    pub t_silent: Duration,
    pub remind_interval: Duration,
    pub violation_window: Duration,
    pub observer_bee: BeeName,
}

/// Duty 1: classify each real bee's liveness from `last_heartbeat`.
/// `< t_idle`: no change. `t_idle..t_silent`: recorded only (a debug log,
/// no write). `>= t_silent`: downgrade to `offline` and alert the observer.
pub async fn classify_liveness(
    store: &Store,
    bus: &MessageBus,
    thresholds: &SupervisorThresholds,
    now: DateTime<Utc>,
) {
    for bee in BeeName::REAL_BEES {
        let state = match store.get_agent_state(bee).await {
            Ok(Some(state)) => state,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(%bee, error = %err, "liveness check failed to read agent state");
                continue;
            }
        };

        let since_heartbeat = (now - state.last_heartbeat)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if since_heartbeat < thresholds.t_idle {
            continue;
        }
        if since_heartbeat < thresholds.t_silent {
            tracing::debug!(%bee, ?since_heartbeat, "bee is quiet but within the silent threshold");
            continue;
        }
        if state.status == AgentStatus::Offline {
            continue;
        }

        if let Err(err) = store.set_agent_status(bee, AgentStatus::Offline).await {
            tracing::warn!(%bee, error = %err, "failed to downgrade silent bee to offline");
            continue;
        }

        if let Err(err) = bus
            .send(
                BeeName::System,
                thresholds.observer_bee,
                MessageType::Alert,
                Some("bee went silent".to_string()),
                format!("{bee} has not sent a heartbeat in over {:?}", thresholds.t_silent),
                SendMessageOptions::default(),
            )
            .await
        {
            tracing::warn!(%bee, error = %err, "failed to alert observer of silent bee");
        }
    }
}

/// Duty 2: every `remind_interval`, nudge each bee with a brief
/// `role_injection` reminder of its identity and current task.
pub async fn send_role_reminders(
    store: &Store,
    bus: &MessageBus,
    thresholds: &SupervisorThresholds,
    last_reminder: &DashMap<BeeName, DateTime<Utc>>,
    now: DateTime<Utc>,
) {
    for bee in BeeName::REAL_BEES {
        let due = last_reminder
            .get(&bee)
            .map(|last| now.signed_duration_since(*last).to_std().unwrap_or(Duration::ZERO) >= thresholds.remind_interval)
            .unwrap_or(true);
        if !due {
            continue;
        }

        let current_task = match store.get_agent_state(bee).await {
            Ok(Some(state)) => state.current_task_id,
            _ => None,
        };
        let content = match current_task {
            Some(task_id) => format!("reminder: you are {bee}, currently working on task {task_id}"),
            None => format!("reminder: you are {bee}, no task currently assigned"),
        };

        if let Err(err) = bus
            .send(
                BeeName::System,
                bee,
                MessageType::RoleInjection,
                Some("role reminder".to_string()),
                content,
                SendMessageOptions::default(),
            )
            .await
        {
            tracing::warn!(%bee, error = %err, "failed to send role reminder");
            continue;
        }
        last_reminder.insert(bee, now);
    }
}

/// Duty 3: messages inserted since `since` with `sender_cli_used = false`
/// are protocol violations; alert the observer at most once per offending
/// sender per `violation_window`.
pub async fn detect_protocol_violations(
    store: &Store,
    bus: &MessageBus,
    thresholds: &SupervisorThresholds,
    last_alerted: &DashMap<BeeName, DateTime<Utc>>,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
) {
    let violations = match store.list_protocol_violations_since(since).await {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(error = %err, "failed to scan for protocol violations");
            return;
        }
    };

    let mut offenders: HashMap<BeeName, usize> = HashMap::new();
    for message in violations {
        *offenders.entry(message.from_bee).or_insert(0) += 1;
    }

    for (bee, count) in offenders {
        let already_alerted = last_alerted
            .get(&bee)
            .map(|last| now.signed_duration_since(*last).to_std().unwrap_or(Duration::ZERO) < thresholds.violation_window)
            .unwrap_or(false);
        if already_alerted {
            continue;
        }

        if let Err(err) = bus
            .send(
                BeeName::System,
                thresholds.observer_bee,
                MessageType::Alert,
                Some("protocol violation".to_string()),
                format!("{bee} sent {count} message(s) bypassing the Message Bus"),
                SendMessageOptions::default(),
            )
            .await
        {
            tracing::warn!(%bee, error = %err, "failed to alert observer of protocol violation");
            continue;
        }
        last_alerted.insert(bee, now);
    }
}

/// Duty 4: mark expired, unprocessed messages as processed so they are
/// never delivered.
pub async fn reap_expired_messages(store: &Store, now: DateTime<Utc>) {
    let expired = match store.list_expired(now).await {
        Ok(messages) => messages,
        Err(err) => {
            tracing::warn!(error = %err, "failed to list expired messages");
            return;
        }
    };

    for message in expired {
        tracing::debug!(message_id = message.message_id, "reaping expired message without delivery");
        if let Err(err) = store.mark_processed(message.message_id, now).await {
            tracing::warn!(message_id = message.message_id, error = %err, "failed to reap expired message");
        }
    }
}

/// Duty 6, the startup half: create the session, spawn one process per
/// pane, inject each bee's role document, then wait for an acknowledgement
/// token or time out (marking the bee `error` on timeout).
pub async fn init_session(
    store: &Store,
    injector: &Injector,
    bus: &MessageBus,
    session: &str,
    panes_and_commands: &[(BeeName, String)],
    role_docs: &HashMap<BeeName, String>,
    ack_pattern: &str,
    ack_timeout: Duration,
) -> beehive_shared::errors::BeehiveResult<()> {
    injector
        .transport()
        .create_session(session)
        .await
        .map_err(beehive_shared::errors::BeehiveError::Transport)?;

    for (bee, command) in panes_and_commands {
        let pane = injector.panes().resolve(*bee)?;
        injector
            .transport()
            .spawn_pane(session, pane, command)
            .await
            .map_err(beehive_shared::errors::BeehiveError::Transport)?;
    }

    for bee in BeeName::REAL_BEES {
        let Some(role_doc) = role_docs.get(&bee) else {
            continue;
        };

        bus.send(
            BeeName::System,
            bee,
            MessageType::RoleInjection,
            Some("role assignment".to_string()),
            role_doc.clone(),
            SendMessageOptions {
                priority: MessagePriority::High,
                ..SendMessageOptions::default()
            },
        )
        .await?;

        match wait_for_ack(bus, bee, ack_pattern, ack_timeout).await {
            true => {
                store.set_agent_status(bee, AgentStatus::Idle).await?;
            }
            false => {
                tracing::warn!(%bee, "no acknowledgement within timeout, marking error");
                store.set_agent_status(bee, AgentStatus::Error).await?;
            }
        }
    }

    Ok(())
}

/// Polls the `system` mailbox for a reply from `bee` whose content matches
/// `ack_pattern` — the bee's CLI-mediated acknowledgement of its injected
/// role document.
async fn wait_for_ack(bus: &MessageBus, bee: BeeName, ack_pattern: &str, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Ok(messages) = bus.receive(BeeName::System, ReceiveOptions::default()).await {
            for message in &messages {
                if message.from_bee == bee && message.content.contains(ack_pattern) {
                    let _ = bus.ack(message.message_id).await;
                    return true;
                }
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Duty 7: graceful shutdown — one last sentinel Injector call per bee,
/// then tear down the multiplexer session. Best-effort: failures are
/// logged, never propagated, since shutdown must proceed regardless.
pub async fn stop_session(injector: &Injector, session: &str) {
    for bee in BeeName::REAL_BEES {
        let options = SendOptions {
            message_type: "notification".to_string(),
            sender: BeeName::System.to_string(),
            metadata: serde_json::json!({ "shutdown": true }),
            dry_run: false,
        };
        if let Err(err) = injector.send(session, bee, "[[HIVE SHUTTING DOWN]]", options).await {
            tracing::warn!(%bee, error = %err, "failed to deliver shutdown sentinel");
        }
    }

    if let Err(err) = injector.transport().kill_session(session).await {
        tracing::warn!(error = %err, "failed to tear down multiplexer session");
    }
}
