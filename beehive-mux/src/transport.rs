//! The external "send text to pane" primitive (spec.md §1 Out of scope:
//! "the multiplexer, treated as an external service"). [`MuxTransport`] is
//! the seam; [`TmuxTransport`] is the concrete tmux-backed implementation.

use async_trait::async_trait;

/// Outcome classes the external primitive partitions into (§4.B.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    PaneNotFound,
    SessionNotFound,
    TransportError(String),
}

#[async_trait]
pub trait MuxTransport: Send + Sync + std::fmt::Debug {
    /// Deliver `payload` to `pane` of `session` as a single submitted line.
    async fn send_text(&self, session: &str, pane: &str, payload: &str) -> SendOutcome;

    /// Create the named session, if the transport supports it. Best effort.
    async fn create_session(&self, session: &str) -> Result<(), String>;

    /// Spawn an interactive process in `pane` running `command`.
    async fn spawn_pane(&self, session: &str, pane: &str, command: &str) -> Result<(), String>;

    /// Tear down the session. Best effort — callers treat failures as
    /// non-fatal during shutdown (§6 exit-path invariants).
    async fn kill_session(&self, session: &str) -> Result<(), String>;

    /// Read back recent pane output (§6 `logs [bee]`). Default
    /// implementation reports the capability as unsupported; only
    /// transports backed by a real multiplexer can satisfy it.
    async fn capture_pane(&self, _session: &str, _pane: &str, _lines: u32) -> Result<String, String> {
        Err("capture_pane not supported by this transport".to_string())
    }
}

/// tmux-backed [`MuxTransport`]. Panes are addressed tmux-style
/// (`session:window.pane`, matching [`BeehiveConfig`]'s default
/// `pane_mapping` values).
#[derive(Debug, Clone, Default)]
pub struct TmuxTransport;

impl TmuxTransport {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, args: &[&str]) -> std::io::Result<std::process::Output> {
        tokio::process::Command::new("tmux").args(args).output().await
    }
}

#[async_trait]
impl MuxTransport for TmuxTransport {
    async fn send_text(&self, session: &str, pane: &str, payload: &str) -> SendOutcome {
        let target = format!("{session}:{pane}");
        let clean = payload.trim_end_matches(['\r', '\n']);

        match self.run(&["send-keys", "-t", &target, clean, "Enter"]).await {
            Ok(output) if output.status.success() => SendOutcome::Delivered,
            Ok(output) => classify_tmux_failure(&String::from_utf8_lossy(&output.stderr)),
            Err(err) => SendOutcome::TransportError(err.to_string()),
        }
    }

    async fn create_session(&self, session: &str) -> Result<(), String> {
        self.run(&["new-session", "-d", "-s", session])
            .await
            .map_err(|e| e.to_string())
            .and_then(|o| {
                if o.status.success() {
                    Ok(())
                } else {
                    Err(String::from_utf8_lossy(&o.stderr).to_string())
                }
            })
    }

    async fn spawn_pane(&self, session: &str, pane: &str, command: &str) -> Result<(), String> {
        let target = format!("{session}:{pane}");
        self.run(&["send-keys", "-t", &target, command, "Enter"])
            .await
            .map_err(|e| e.to_string())
            .and_then(|o| {
                if o.status.success() {
                    Ok(())
                } else {
                    Err(String::from_utf8_lossy(&o.stderr).to_string())
                }
            })
    }

    async fn kill_session(&self, session: &str) -> Result<(), String> {
        self.run(&["kill-session", "-t", session])
            .await
            .map_err(|e| e.to_string())
            .and_then(|o| {
                if o.status.success() {
                    Ok(())
                } else {
                    Err(String::from_utf8_lossy(&o.stderr).to_string())
                }
            })
    }

    async fn capture_pane(&self, session: &str, pane: &str, lines: u32) -> Result<String, String> {
        let target = format!("{session}:{pane}");
        let start = format!("-{lines}");
        self.run(&["capture-pane", "-p", "-t", &target, "-S", &start])
            .await
            .map_err(|e| e.to_string())
            .and_then(|o| {
                if o.status.success() {
                    Ok(String::from_utf8_lossy(&o.stdout).to_string())
                } else {
                    Err(String::from_utf8_lossy(&o.stderr).to_string())
                }
            })
    }
}

fn classify_tmux_failure(stderr: &str) -> SendOutcome {
    if stderr.contains("can't find pane") || stderr.contains("can't find window") {
        SendOutcome::PaneNotFound
    } else if stderr.contains("can't find session") || stderr.contains("no server running") {
        SendOutcome::SessionNotFound
    } else {
        SendOutcome::TransportError(stderr.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_distinguishes_pane_from_session_failures() {
        assert_eq!(
            classify_tmux_failure("can't find pane: hive:9.9"),
            SendOutcome::PaneNotFound
        );
        assert_eq!(
            classify_tmux_failure("can't find session: ghost"),
            SendOutcome::SessionNotFound
        );
        assert!(matches!(
            classify_tmux_failure("some other tmux error"),
            SendOutcome::TransportError(_)
        ));
    }
}
