//! `remind [--bee X]` (§6): force an immediate role-reminder sweep,
//! bypassing the Supervisor's usual `remind_interval` gate.

use std::str::FromStr;

use beehive_shared::model::BeeName;
use beehive_shared::BeehiveConfig;

use crate::hive::Hive;
use crate::output;

pub(crate) async fn handle_remind(config: BeehiveConfig, bee: Option<String>) -> anyhow::Result<()> {
    let hive = Hive::connect(config).await?;

    let bee = bee
        .map(|name| BeeName::from_str(&name).map_err(|_| anyhow::anyhow!("unrecognized bee: {name}")))
        .transpose()?;

    hive.supervisor.remind_now(bee).await;

    match bee {
        Some(bee) => output::success(format!("sent an immediate reminder to {bee}")),
        None => output::success("sent an immediate reminder sweep to every bee"),
    }

    Ok(())
}
