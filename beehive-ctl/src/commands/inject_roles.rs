//! `inject-roles [bee|--all]` (§6): reinject role prompts without tearing
//! down the session.

use std::path::Path;
use std::str::FromStr;

use beehive_shared::model::{BeeName, MessagePriority, MessageType};
use beehive_shared::BeehiveConfig;
use beehive_bus::SendMessageOptions;

use crate::cli_config::load_session_spec;
use crate::hive::Hive;
use crate::output;

pub(crate) async fn handle_inject_roles(
    config: BeehiveConfig,
    session_config_path: Option<&Path>,
    bee: Option<String>,
    all: bool,
) -> anyhow::Result<()> {
    let hive = Hive::connect(config).await?;
    let spec = load_session_spec(&hive.config.db_path, session_config_path);
    let role_docs = spec.load_role_docs();

    let targets: Vec<BeeName> = if all || bee.is_none() {
        BeeName::REAL_BEES.to_vec()
    } else {
        let name = bee.unwrap();
        vec![BeeName::from_str(&name).map_err(|_| anyhow::anyhow!("unrecognized bee: {name}"))?]
    };

    for target in targets {
        let Some(doc) = role_docs.get(&target) else {
            output::warning(format!("no role document configured for {target}, skipping"));
            continue;
        };

        hive.bus
            .send(
                BeeName::System,
                target,
                MessageType::RoleInjection,
                Some("role reinjection".to_string()),
                doc.clone(),
                SendMessageOptions {
                    priority: MessagePriority::High,
                    ..SendMessageOptions::default()
                },
            )
            .await?;
        output::success(format!("reinjected role for {target}"));
    }

    Ok(())
}
