//! `logs [bee]` (§6): read back recent pane output. A read-only op, so it
//! talks to [`MuxTransport`] directly rather than through the [`Injector`]'s
//! per-pane locking.

use std::str::FromStr;

use beehive_mux::{MuxTransport, PaneTable, TmuxTransport};
use beehive_shared::model::BeeName;
use beehive_shared::BeehiveConfig;

use crate::output;

pub(crate) async fn handle_logs(config: BeehiveConfig, bee: Option<String>, lines: u32) -> anyhow::Result<()> {
    let panes = PaneTable::from_config(&config);
    let transport = TmuxTransport::new();

    let targets: Vec<(BeeName, String)> = match bee {
        Some(name) => {
            let bee = BeeName::from_str(&name).map_err(|_| anyhow::anyhow!("unrecognized bee: {name}"))?;
            let pane = panes.resolve(bee)?;
            vec![(bee, pane.to_string())]
        }
        None => panes
            .resolve_all()
            .into_iter()
            .map(|(bee, pane)| (bee, pane.to_string()))
            .collect(),
    };

    for (bee, pane) in targets {
        output::header(format!("{bee} ({pane})"));
        match transport.capture_pane(&config.session_name, &pane, lines).await {
            Ok(text) => output::plain(text),
            Err(e) => output::warning(format!("could not capture {bee}'s pane: {e}")),
        }
        output::blank();
    }

    Ok(())
}
