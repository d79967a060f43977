//! `attach` (§6): hand off to the multiplexer's own attach, replacing this
//! process. Interactive terminal handoff doesn't fit the `Result`-returning
//! `MuxTransport` seam, so this shells out to `tmux` directly.

use beehive_shared::BeehiveConfig;

pub(crate) async fn handle_attach(config: BeehiveConfig) -> anyhow::Result<()> {
    let status = tokio::process::Command::new("tmux")
        .args(["attach-session", "-t", &config.session_name])
        .status()
        .await?;

    if !status.success() {
        anyhow::bail!("tmux attach-session exited with {status}");
    }
    Ok(())
}
