//! Session launch configuration for `init`/`daemon start`.
//!
//! Separate from `beehive_shared::BeehiveConfig` — this controls what gets
//! spawned into each pane and which role document each bee is injected
//! with; `BeehiveConfig` controls the coordination substrate itself.

pub(crate) mod loader;

pub(crate) use loader::load_session_spec;

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// The `hive/session.toml` shape. Every field has a sensible empty/short
/// default so `init` still runs (with nothing to spawn) against a fresh
/// checkout that hasn't written one yet.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct SessionSpec {
    /// The interactive command to launch in each bee's pane, keyed by bee
    /// name (e.g. `queen = "claude --role queen"`).
    #[serde(default)]
    pub commands: HashMap<String, String>,

    /// Paths to each bee's role document, keyed by bee name. Contents are
    /// read and injected verbatim as the `role_injection` message body.
    #[serde(default)]
    pub role_docs: HashMap<String, String>,

    /// Text a bee's acknowledgement reply must contain for `init` to
    /// consider its role injection successful.
    #[serde(default = "default_ack_pattern")]
    pub ack_pattern: String,

    #[serde(default = "default_ack_timeout_secs")]
    pub ack_timeout_secs: u64,
}

fn default_ack_pattern() -> String {
    "ROLE ACKNOWLEDGED".to_string()
}

fn default_ack_timeout_secs() -> u64 {
    30
}

impl SessionSpec {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    /// Resolve `role_docs` paths to their file contents, keyed by
    /// [`beehive_shared::model::BeeName`]. Missing/unreadable files are
    /// skipped with a warning rather than failing `init` outright — a bee
    /// with no role document simply never receives one.
    pub fn load_role_docs(&self) -> HashMap<beehive_shared::model::BeeName, String> {
        use std::str::FromStr;

        let mut docs = HashMap::new();
        for (bee, path) in &self.role_docs {
            let Ok(bee) = beehive_shared::model::BeeName::from_str(bee) else {
                tracing::warn!(%bee, "unrecognized bee name in session spec role_docs");
                continue;
            };
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    docs.insert(bee, contents);
                }
                Err(err) => {
                    tracing::warn!(%bee, %path, error = %err, "failed to read role document");
                }
            }
        }
        docs
    }

    pub fn commands_by_bee(&self) -> HashMap<beehive_shared::model::BeeName, String> {
        use std::str::FromStr;

        let mut commands = HashMap::new();
        for (bee, command) in &self.commands {
            if let Ok(bee) = beehive_shared::model::BeeName::from_str(bee) {
                commands.insert(bee, command.clone());
            }
        }
        commands
    }
}
