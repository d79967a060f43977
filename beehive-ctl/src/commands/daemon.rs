//! `daemon {start|stop|status|restart|remind|logs}` (§6): run the
//! Supervisor tick loop as a detached background process.
//!
//! No process-management dependency: `start` re-execs this same binary into
//! the hidden `__supervisor` subcommand and detaches it, `stop`/`status`
//! shell out to `kill -TERM`/`kill -0`, consistent with [`beehive_mux`]'s
//! own shell-out idiom to `tmux`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use beehive_shared::BeehiveConfig;

use crate::hive::Hive;
use crate::output;
use crate::DaemonCommand;

fn state_dir(config: &BeehiveConfig) -> PathBuf {
    config
        .db_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn pid_file(config: &BeehiveConfig) -> PathBuf {
    state_dir(config).join("supervisor.pid")
}

fn log_file(config: &BeehiveConfig) -> PathBuf {
    state_dir(config).join("supervisor.log")
}

fn read_pid(config: &BeehiveConfig) -> Option<u32> {
    std::fs::read_to_string(pid_file(config)).ok()?.trim().parse().ok()
}

fn process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub(crate) async fn handle_daemon_command(config: BeehiveConfig, cmd: DaemonCommand) -> anyhow::Result<()> {
    match cmd {
        DaemonCommand::Start => start(&config).await,
        DaemonCommand::Stop => stop(&config).await,
        DaemonCommand::Status => status(&config).await,
        DaemonCommand::Restart => {
            stop(&config).await?;
            start(&config).await
        }
        DaemonCommand::Remind => {
            let hive = Hive::connect(config).await?;
            hive.supervisor.remind_now(None).await;
            output::success("sent an immediate reminder sweep to every bee");
            Ok(())
        }
        DaemonCommand::Logs { n } => logs(&config, n),
    }
}

async fn start(config: &BeehiveConfig) -> anyhow::Result<()> {
    if let Some(pid) = read_pid(config) {
        if process_alive(pid) {
            output::warning(format!("supervisor already running (pid {pid})"));
            std::process::exit(2);
        }
    }

    std::fs::create_dir_all(state_dir(config))?;
    let log = std::fs::File::create(log_file(config))?;

    let exe = std::env::current_exe()?;
    let mut command = std::process::Command::new(exe);
    command.arg("__supervisor");
    if let Ok(config_path) = std::env::var("BEEHIVE_CONFIG_FILE") {
        command.env("BEEHIVE_CONFIG_FILE", config_path);
    }
    command
        .env("BEEHIVE_DB_PATH", &config.db_path)
        .stdin(Stdio::null())
        .stdout(log.try_clone()?)
        .stderr(log);

    let child = command.spawn()?;
    std::fs::write(pid_file(config), child.id().to_string())?;

    output::success(format!("supervisor started (pid {})", child.id()));
    Ok(())
}

async fn stop(config: &BeehiveConfig) -> anyhow::Result<()> {
    let Some(pid) = read_pid(config) else {
        output::warning("supervisor is not running");
        return Ok(());
    };

    if !process_alive(pid) {
        output::warning(format!("stale pid file (pid {pid} is not running), cleaning up"));
        let _ = std::fs::remove_file(pid_file(config));
        return Ok(());
    }

    let status = std::process::Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()?;
    if !status.success() {
        anyhow::bail!("failed to signal supervisor (pid {pid})");
    }

    let _ = std::fs::remove_file(pid_file(config));
    output::success(format!("supervisor stopped (pid {pid})"));
    Ok(())
}

async fn status(config: &BeehiveConfig) -> anyhow::Result<()> {
    match read_pid(config) {
        Some(pid) if process_alive(pid) => output::status_icon(true, format!("supervisor running (pid {pid})")),
        Some(pid) => output::status_icon(false, format!("supervisor not running (stale pid {pid})")),
        None => output::status_icon(false, "supervisor not running"),
    }
    Ok(())
}

fn logs(config: &BeehiveConfig, n: usize) -> anyhow::Result<()> {
    let path = log_file(config);
    let text = std::fs::read_to_string(&path).unwrap_or_default();
    let tail: Vec<&str> = text.lines().rev().take(n).collect();
    for line in tail.into_iter().rev() {
        output::plain(line);
    }
    Ok(())
}

/// The `__supervisor` re-exec target: run the tick loop in the foreground
/// until `SIGTERM`.
pub(crate) async fn run_supervisor_foreground(config: BeehiveConfig) -> anyhow::Result<()> {
    let hive = Hive::connect(config).await?;
    let supervisor = Arc::new(hive.supervisor);
    let handle = beehive_supervisor::run(supervisor);

    let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = term.recv() => {
            tracing::info!("received SIGTERM, shutting down");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }

    handle.join().await;
    Ok(())
}
