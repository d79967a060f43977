//! Wires the six components into the handles a CLI invocation needs.
//!
//! Every subcommand opens its own [`Hive`] against the configured store —
//! the CLI is a short-lived process per invocation (except `daemon`, which
//! re-execs itself into the long-running supervisor loop). `Injector` and
//! `MessageBus` aren't `Clone`, so each consumer gets its own instance over
//! a shared `Store` clone (the store is a cheap pool handle).

use std::sync::Arc;

use beehive_bus::MessageBus;
use beehive_engine::TaskEngine;
use beehive_mux::{Injector, PaneTable, TmuxTransport};
use beehive_shared::errors::BeehiveResult;
use beehive_shared::BeehiveConfig;
use beehive_store::Store;
use beehive_supervisor::Supervisor;

pub(crate) struct Hive {
    pub config: BeehiveConfig,
    pub store: Store,
    pub bus: MessageBus,
    pub engine: TaskEngine,
    pub supervisor: Supervisor,
}

impl Hive {
    pub async fn connect(config: BeehiveConfig) -> BeehiveResult<Self> {
        let store = Store::connect(&config.db_path, config.db_timeout()).await?;
        let transport = Arc::new(TmuxTransport::new());

        let bus = MessageBus::new(
            store.clone(),
            Injector::new(
                PaneTable::from_config(&config),
                transport.clone(),
                store.clone(),
                config.injector_concurrency,
            ),
            config.session_name.clone(),
        );

        let engine = TaskEngine::new(
            store.clone(),
            MessageBus::new(
                store.clone(),
                Injector::new(
                    PaneTable::from_config(&config),
                    transport.clone(),
                    store.clone(),
                    config.injector_concurrency,
                ),
                config.session_name.clone(),
            ),
        );

        let supervisor = Supervisor::new(
            store.clone(),
            MessageBus::new(
                store.clone(),
                Injector::new(
                    PaneTable::from_config(&config),
                    transport.clone(),
                    store.clone(),
                    config.injector_concurrency,
                ),
                config.session_name.clone(),
            ),
            Injector::new(
                PaneTable::from_config(&config),
                transport,
                store.clone(),
                config.injector_concurrency,
            ),
            &config,
        );

        Ok(Self {
            config,
            store,
            bus,
            engine,
            supervisor,
        })
    }
}
