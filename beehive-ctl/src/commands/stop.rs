//! `stop` (§6): graceful shutdown with interactive confirmation.
//!
//! A sentinel goes to every bee, then the multiplexer session is torn down.
//! Confirmation is skipped when stdin isn't a TTY and the first line reads
//! `y` (scripted callers), matching the non-interactive fallback used
//! elsewhere in the CLI.

use std::io::{BufRead, IsTerminal, Write};

use beehive_shared::BeehiveConfig;

use crate::hive::Hive;
use crate::output;

pub(crate) async fn handle_stop(config: BeehiveConfig) -> anyhow::Result<()> {
    if !confirm(&config.session_name)? {
        output::plain("aborted");
        return Ok(());
    }

    let hive = Hive::connect(config).await?;
    hive.supervisor.stop(&hive.config.session_name).await;
    output::success("hive stopped");
    Ok(())
}

fn confirm(session: &str) -> anyhow::Result<bool> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        let line = stdin.lock().lines().next().transpose()?.unwrap_or_default();
        return Ok(line.trim().eq_ignore_ascii_case("y"));
    }

    print!("tear down hive \"{session}\"? [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}
