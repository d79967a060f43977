//! The Injector (§4.B): delivers a payload into a pane, durably recording
//! the attempt. Never retries — retry is the caller's policy.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use beehive_shared::errors::{BeehiveError, BeehiveResult};
use beehive_shared::model::{BeeName, InjectionLogEntry, InjectionOutcome};
use beehive_store::Store;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};

use crate::pane::PaneTable;
use crate::transport::{MuxTransport, SendOutcome};

/// Everything about a `send` call beyond the raw payload. `message_type`
/// and `sender` are carried for the log only — the Injector has no notion
/// of the domain `Message` type, that belongs to the Message Bus.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub message_type: String,
    pub sender: String,
    pub metadata: serde_json::Value,
    pub dry_run: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            message_type: "info".to_string(),
            sender: BeeName::System.to_string(),
            metadata: serde_json::json!({}),
            dry_run: false,
        }
    }
}

/// Per-pane serialization plus a process-wide concurrency cap (§5: "a small
/// fixed number of concurrent Injector calls, bounded, default 4").
pub struct Injector {
    panes: PaneTable,
    transport: Arc<dyn MuxTransport>,
    store: Store,
    locks: DashMap<String, Arc<Mutex<()>>>,
    concurrency: Arc<Semaphore>,
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector").finish_non_exhaustive()
    }
}

impl Injector {
    pub fn new(panes: PaneTable, transport: Arc<dyn MuxTransport>, store: Store, concurrency: usize) -> Self {
        Self {
            panes,
            transport,
            store,
            locks: DashMap::new(),
            concurrency: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    fn lock_for(&self, pane: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(pane.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Deliver `payload` into `to_bee`'s pane within `session`, logging the
    /// attempt. Returns the assigned injection-log row id (§4.B.5's
    /// "message_id").
    pub async fn send(
        &self,
        session: &str,
        to_bee: BeeName,
        payload: &str,
        options: SendOptions,
    ) -> BeehiveResult<i64> {
        let pane = self.panes.resolve(to_bee)?.to_string();
        let payload_hash = hash_payload(payload);
        let now = Utc::now();

        if options.dry_run {
            tracing::debug!(pane = %pane, "dry-run injection, skipping transport");
            return self
                .store
                .append_injection_log(&InjectionLogEntry {
                    id: 0,
                    session: session.to_string(),
                    pane,
                    payload_hash,
                    message_type: options.message_type,
                    sender: options.sender,
                    metadata: options.metadata,
                    dry_run: true,
                    created_at: now,
                    outcome: InjectionOutcome::DryRun,
                })
                .await;
        }

        let _permit = self
            .concurrency
            .acquire()
            .await
            .map_err(|_| BeehiveError::Cancelled)?;
        let pane_lock = self.lock_for(&pane);
        let _pane_guard = pane_lock.lock().await;

        let outcome = self.transport.send_text(session, &pane, payload).await;
        let (log_outcome, result) = match &outcome {
            SendOutcome::Delivered => (InjectionOutcome::Delivered, Ok(())),
            SendOutcome::PaneNotFound => (
                InjectionOutcome::PaneNotFound,
                Err(BeehiveError::InvalidPane(pane.clone())),
            ),
            SendOutcome::SessionNotFound => (
                InjectionOutcome::SessionNotFound,
                Err(BeehiveError::Transport(format!("session not found: {session}"))),
            ),
            SendOutcome::TransportError(detail) => (
                InjectionOutcome::TransportError,
                Err(BeehiveError::Transport(detail.clone())),
            ),
        };

        let log_id = self
            .store
            .append_injection_log(&InjectionLogEntry {
                id: 0,
                session: session.to_string(),
                pane,
                payload_hash,
                message_type: options.message_type,
                sender: options.sender,
                metadata: options.metadata,
                dry_run: false,
                created_at: now,
                outcome: log_outcome,
            })
            .await?;

        result.map(|()| log_id)
    }

    pub fn panes(&self) -> &PaneTable {
        &self.panes
    }

    pub fn transport(&self) -> &Arc<dyn MuxTransport> {
        &self.transport
    }
}

fn hash_payload(payload: &str) -> String {
    let mut hasher = DefaultHasher::new();
    payload.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use beehive_shared::BeehiveConfig;

    use super::*;

    #[derive(Debug, Default)]
    struct MockTransport {
        calls: AtomicUsize,
        outcome: std::sync::Mutex<SendOutcome>,
    }

    impl MockTransport {
        fn with_outcome(outcome: SendOutcome) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: std::sync::Mutex::new(outcome),
            }
        }
    }

    #[async_trait]
    impl MuxTransport for MockTransport {
        async fn send_text(&self, _session: &str, _pane: &str, _payload: &str) -> SendOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.lock().unwrap().clone()
        }

        async fn create_session(&self, _session: &str) -> Result<(), String> {
            Ok(())
        }

        async fn spawn_pane(&self, _session: &str, _pane: &str, _command: &str) -> Result<(), String> {
            Ok(())
        }

        async fn kill_session(&self, _session: &str) -> Result<(), String> {
            Ok(())
        }
    }

    async fn make_injector(outcome: SendOutcome) -> Injector {
        let config = BeehiveConfig::default();
        let panes = PaneTable::from_config(&config);
        let store = Store::connect_in_memory().await.unwrap();
        let transport = Arc::new(MockTransport::with_outcome(outcome));
        Injector::new(panes, transport, store, 4)
    }

    #[tokio::test]
    async fn successful_send_logs_delivered_and_returns_id() {
        let injector = make_injector(SendOutcome::Delivered).await;
        let id = injector
            .send("hive", BeeName::Queen, "hello", SendOptions::default())
            .await
            .unwrap();
        assert!(id > 0);
    }

    #[tokio::test]
    async fn dry_run_never_touches_transport() {
        let injector = make_injector(SendOutcome::Delivered).await;
        let options = SendOptions {
            dry_run: true,
            ..SendOptions::default()
        };
        let id = injector
            .send("hive", BeeName::Queen, "hello", options)
            .await
            .unwrap();
        assert!(id > 0);
    }

    #[tokio::test]
    async fn pane_not_found_surfaces_invalid_pane_and_logs_outcome() {
        let injector = make_injector(SendOutcome::PaneNotFound).await;
        let err = injector
            .send("hive", BeeName::Developer, "hello", SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BeehiveError::InvalidPane(_)));

        let logs = injector.store.list_injection_log("hive:0.1", 10).await.unwrap();
        assert_eq!(logs[0].outcome, InjectionOutcome::PaneNotFound);
    }

    #[tokio::test]
    async fn unresolved_bee_never_reaches_transport() {
        let injector = make_injector(SendOutcome::Delivered).await;
        let err = injector
            .send("hive", BeeName::System, "hello", SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BeehiveError::InvalidPane(_)));
    }
}
