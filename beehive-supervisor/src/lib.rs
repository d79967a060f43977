//! # beehive-supervisor
//!
//! The Supervisor (§4.F): a tick-driven watchdog over liveness, reminders,
//! protocol violations, and expired messages, plus session startup/shutdown.

mod duties;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use beehive_bus::MessageBus;
use beehive_mux::Injector;
use beehive_shared::errors::BeehiveResult;
use beehive_shared::model::{AgentStatus, BeeName};
use beehive_shared::BeehiveConfig;
use beehive_store::Store;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

pub use duties::SupervisorThresholds;

impl SupervisorThresholds {
    pub fn from_config(config: &BeehiveConfig) -> Self {
        Self {
            t_idle: Duration::from_secs(config.t_idle_secs),
            t_silent: Duration::from_secs(config.t_silent_secs),
            remind_interval: Duration::from_secs(config.remind_interval_secs),
            violation_window: Duration::from_secs(config.protocol_violation_window_secs),
            observer_bee: config.observer_bee.parse().unwrap_or(BeeName::Queen),
        }
    }
}

/// §4.F duty 6 input: the startup recipe for `init`.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub session: String,
    /// The interactive command to launch in each bee's pane (e.g. the
    /// hosted LLM CLI invocation).
    pub commands: HashMap<BeeName, String>,
    pub role_docs: HashMap<BeeName, String>,
    pub ack_pattern: String,
    pub ack_timeout: Duration,
}

pub struct Supervisor {
    store: Store,
    bus: MessageBus,
    injector: Injector,
    thresholds: SupervisorThresholds,
    tick_interval: Duration,
    last_reminder: DashMap<BeeName, DateTime<Utc>>,
    last_violation_alert: DashMap<BeeName, DateTime<Utc>>,
    last_tick: std::sync::Mutex<DateTime<Utc>>,
}

impl Supervisor {
    pub fn new(store: Store, bus: MessageBus, injector: Injector, config: &BeehiveConfig) -> Self {
        Self {
            store,
            bus,
            injector,
            thresholds: SupervisorThresholds::from_config(config),
            tick_interval: Duration::from_secs(config.supervisor_tick_secs),
            last_reminder: DashMap::new(),
            last_violation_alert: DashMap::new(),
            last_tick: std::sync::Mutex::new(Utc::now()),
        }
    }

    /// §4.F duty 6: bring the session up — create it, spawn each pane's
    /// process, inject role documents, and wait for an ack per bee.
    pub async fn init(&self, session: &SessionConfig) -> BeehiveResult<()> {
        let panes_and_commands: Vec<(BeeName, String)> = BeeName::REAL_BEES
            .into_iter()
            .filter_map(|bee| session.commands.get(&bee).map(|cmd| (bee, cmd.clone())))
            .collect();

        duties::init_session(
            &self.store,
            &self.injector,
            &self.bus,
            &session.session,
            &panes_and_commands,
            &session.role_docs,
            &session.ack_pattern,
            session.ack_timeout,
        )
        .await
    }

    /// §4.F duty 5: accept a heartbeat from `bee`. A heartbeat implicitly
    /// moves `offline → idle`, or `offline → busy` if a task is active.
    pub async fn heartbeat(&self, bee: BeeName) -> BeehiveResult<()> {
        let now = Utc::now();
        self.store.record_heartbeat(bee, now).await?;

        if let Some(state) = self.store.get_agent_state(bee).await? {
            if state.status == AgentStatus::Offline {
                let revived = if state.current_task_id.is_some() {
                    AgentStatus::Busy
                } else {
                    AgentStatus::Idle
                };
                self.store.set_agent_status(bee, revived).await?;
            }
        }
        Ok(())
    }

    /// Run every duty once. Never returns an error: each duty logs and
    /// degrades independently per §4.F's failure semantics.
    pub async fn tick(&self) {
        let now = Utc::now();
        let since = {
            let mut last = self.last_tick.lock().expect("last_tick mutex poisoned");
            let previous = *last;
            *last = now;
            previous
        };

        duties::classify_liveness(&self.store, &self.bus, &self.thresholds, now).await;
        duties::send_role_reminders(&self.store, &self.bus, &self.thresholds, &self.last_reminder, now).await;
        duties::detect_protocol_violations(
            &self.store,
            &self.bus,
            &self.thresholds,
            &self.last_violation_alert,
            since,
            now,
        )
        .await;
        duties::reap_expired_messages(&self.store, now).await;
    }

    /// Force duty 2 (role reminders) to run immediately, bypassing
    /// `remind_interval` for `bee` (or every bee, if `None`). Used by
    /// `beehive-ctl remind`.
    pub async fn remind_now(&self, bee: Option<BeeName>) {
        match bee {
            Some(bee) => {
                self.last_reminder.remove(&bee);
            }
            None => self.last_reminder.clear(),
        }
        let now = Utc::now();
        duties::send_role_reminders(&self.store, &self.bus, &self.thresholds, &self.last_reminder, now).await;
    }

    /// §4.F duty 7: graceful shutdown — sentinel to each bee, then tear
    /// down the multiplexer session.
    pub async fn stop(&self, session: &str) {
        duties::stop_session(&self.injector, session).await;
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

/// A running [`Supervisor`] tick loop, spawned via [`run`].
pub struct SupervisorHandle {
    shutdown: tokio::sync::mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl SupervisorHandle {
    /// Signal the tick loop to stop and wait for the current duty sweep to
    /// finish (§5: "the Supervisor tick is itself cancellable; on shutdown
    /// it finishes its current duty sweep and exits cleanly").
    pub async fn join(self) {
        let _ = self.shutdown.send(()).await;
        let _ = self.task.await;
    }
}

/// Spawn `supervisor`'s tick loop as a background task, firing every
/// `tick_interval` until [`SupervisorHandle::join`] is called.
pub fn run(supervisor: Arc<Supervisor>) -> SupervisorHandle {
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let tick_interval = supervisor.tick_interval;

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    supervisor.tick().await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("supervisor tick loop received shutdown signal");
                    break;
                }
            }
        }
    });

    SupervisorHandle {
        shutdown: shutdown_tx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use beehive_mux::{MuxTransport, PaneTable, SendOutcome};

    use super::*;

    #[derive(Debug, Default)]
    struct CountingTransport {
        sends: AtomicUsize,
    }

    #[async_trait]
    impl MuxTransport for CountingTransport {
        async fn send_text(&self, _session: &str, _pane: &str, _payload: &str) -> SendOutcome {
            self.sends.fetch_add(1, Ordering::SeqCst);
            SendOutcome::Delivered
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

    async fn make_supervisor() -> (Supervisor, Arc<CountingTransport>) {
        let config = BeehiveConfig::default();
        let panes = PaneTable::from_config(&config);
        let store = Store::connect_in_memory().await.unwrap();
        let transport = Arc::new(CountingTransport::default());
        let injector = Injector::new(panes, transport.clone(), store.clone(), 4);
        let bus = MessageBus::new(store.clone(), injector, config.session_name.clone());

        let panes2 = PaneTable::from_config(&config);
        let injector2 = Injector::new(panes2, transport.clone(), store.clone(), 4);
        (Supervisor::new(store, bus, injector2, &config), transport)
    }

    #[tokio::test]
    async fn heartbeat_revives_offline_bee_to_idle() {
        let (supervisor, _transport) = make_supervisor().await;
        supervisor
            .store()
            .set_agent_status(BeeName::Developer, AgentStatus::Offline)
            .await
            .unwrap();

        supervisor.heartbeat(BeeName::Developer).await.unwrap();

        let state = supervisor.store().get_agent_state(BeeName::Developer).await.unwrap().unwrap();
        assert_eq!(state.status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn tick_classifies_silent_bee_as_offline_and_alerts_observer() {
        let (supervisor, _transport) = make_supervisor().await;
        let stale = Utc::now() - chrono::Duration::seconds(3600);
        supervisor
            .store()
            .upsert_agent_state(&beehive_shared::model::AgentState {
                bee_name: BeeName::Analyst,
                status: AgentStatus::Idle,
                current_task_id: None,
                last_activity: stale,
                last_heartbeat: stale,
                workload_score: 0,
                performance_score: 100,
                capabilities: vec![],
            })
            .await
            .unwrap();

        supervisor.tick().await;

        let state = supervisor.store().get_agent_state(BeeName::Analyst).await.unwrap().unwrap();
        assert_eq!(state.status, AgentStatus::Offline);

        let alerts = supervisor.store().dequeue_for(BeeName::Queen, Utc::now()).await.unwrap();
        assert!(alerts.iter().any(|m| m.content.contains("Analyst") || m.content.contains("analyst")));
    }

    #[tokio::test]
    async fn stop_sends_sentinel_to_every_real_bee() {
        let (supervisor, transport) = make_supervisor().await;
        supervisor.stop("hive").await;
        assert_eq!(transport.sends.load(Ordering::SeqCst), BeeName::REAL_BEES.len());
    }

    #[tokio::test]
    async fn spawn_and_join_completes_cleanly() {
        let (supervisor, _transport) = make_supervisor().await;
        let handle = run(Arc::new(supervisor));
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.join().await;
    }
}
