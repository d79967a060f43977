//! `init [--force]` (§6): create the multiplexer session, spawn bees,
//! inject role documents. Exit codes: 0 success, 2 already running (without
//! `--force`), 3 multiplexer unavailable, 4 role injection timeout.

use std::path::Path;

use beehive_shared::model::{AgentStatus, BeeName};
use beehive_shared::BeehiveConfig;
use beehive_supervisor::SessionConfig;

use crate::cli_config::load_session_spec;
use crate::hive::Hive;
use crate::output;

pub(crate) async fn handle_init(
    config: BeehiveConfig,
    session_config_path: Option<&Path>,
    force: bool,
) -> anyhow::Result<()> {
    let hive = Hive::connect(config).await?;

    if !force {
        let already_running = hive
            .store
            .list_agent_states()
            .await?
            .iter()
            .any(|s| s.status != AgentStatus::Offline);
        if already_running {
            output::warning("the hive already appears to be running (pass --force to reinitialize)");
            std::process::exit(2);
        }
    }

    let spec = load_session_spec(&hive.config.db_path, session_config_path);
    let session = SessionConfig {
        session: hive.config.session_name.clone(),
        commands: spec.commands_by_bee(),
        role_docs: spec.load_role_docs(),
        ack_pattern: spec.ack_pattern.clone(),
        ack_timeout: spec.ack_timeout(),
    };

    if session.commands.is_empty() {
        output::warning("no bee commands configured in session.toml — the session will be created empty");
    }

    output::plain(format!("creating session \"{}\"...", session.session));
    hive.supervisor.init(&session).await?;

    let mut any_timed_out = false;
    for bee in BeeName::REAL_BEES {
        let state = hive.store.get_agent_state(bee).await?;
        match state.map(|s| s.status) {
            Some(AgentStatus::Idle) => output::status_icon(true, format!("{bee} acknowledged its role")),
            Some(AgentStatus::Error) => {
                output::status_icon(false, format!("{bee} did not acknowledge in time"));
                any_timed_out = true;
            }
            other => output::status_icon(false, format!("{bee}: unexpected state {other:?}")),
        }
    }

    if any_timed_out {
        output::error("one or more bees failed to acknowledge their role injection");
        std::process::exit(4);
    }

    output::success("hive initialized");
    Ok(())
}
