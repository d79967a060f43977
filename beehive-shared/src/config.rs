//! # Configuration
//!
//! Layered configuration per §6: a TOML file, `BEEHIVE_`-prefixed
//! environment variables, then CLI flags, in that precedence order. The
//! CLI crate owns flag parsing; this module owns the file+env layer and
//! the canonical defaults every component falls back to.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::BeeName;

/// `{bee: pane}` table, §4.A. Values are opaque multiplexer pane ids.
pub type PaneMapping = HashMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeehiveConfig {
    pub session_name: String,
    pub db_path: PathBuf,
    pub log_level: String,
    pub db_timeout_secs: u64,
    pub pane_mapping: PaneMapping,
    pub remind_interval_secs: u64,
    pub t_idle_secs: u64,
    pub t_silent_secs: u64,
    pub injector_concurrency: usize,
    pub observer_bee: String,
    pub supervisor_tick_secs: u64,
    pub protocol_violation_window_secs: u64,
}

impl Default for BeehiveConfig {
    fn default() -> Self {
        let mut pane_mapping = PaneMapping::new();
        for bee in BeeName::REAL_BEES {
            pane_mapping.insert(bee.as_str().to_string(), format!("hive:0.{}", pane_index(bee)));
        }

        Self {
            session_name: "hive".to_string(),
            db_path: PathBuf::from("hive/hive_memory.db"),
            log_level: "info".to_string(),
            db_timeout_secs: 5,
            pane_mapping,
            remind_interval_secs: 300,
            t_idle_secs: 120,
            t_silent_secs: 600,
            injector_concurrency: 4,
            observer_bee: "queen".to_string(),
            supervisor_tick_secs: 5,
            protocol_violation_window_secs: 60,
        }
    }
}

fn pane_index(bee: BeeName) -> usize {
    BeeName::REAL_BEES
        .iter()
        .position(|b| *b == bee)
        .unwrap_or(0)
}

impl BeehiveConfig {
    /// Load configuration from (in ascending precedence order): built-in
    /// defaults, an optional TOML file, `BEEHIVE_`-prefixed environment
    /// variables. CLI flags are layered on top by the caller via
    /// [`BeehiveConfig::with_overrides`].
    pub fn load(file_path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("session_name", defaults.session_name.clone())?
            .set_default("db_path", defaults.db_path.to_string_lossy().to_string())?
            .set_default("log_level", defaults.log_level.clone())?
            .set_default("db_timeout_secs", defaults.db_timeout_secs)?
            .set_default("remind_interval_secs", defaults.remind_interval_secs)?
            .set_default("t_idle_secs", defaults.t_idle_secs)?
            .set_default("t_silent_secs", defaults.t_silent_secs)?
            .set_default("injector_concurrency", defaults.injector_concurrency as i64)?
            .set_default("observer_bee", defaults.observer_bee.clone())?
            .set_default("supervisor_tick_secs", defaults.supervisor_tick_secs)?
            .set_default(
                "protocol_violation_window_secs",
                defaults.protocol_violation_window_secs,
            )?;

        if let Some(path) = file_path {
            if path.is_file() {
                builder = builder.add_source(config::File::from(path));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BEEHIVE")
                .separator("__")
                .try_parsing(true),
        );

        let built = builder.build()?;
        let mut parsed: BeehiveConfig = built.try_deserialize()?;
        if parsed.pane_mapping.is_empty() {
            parsed.pane_mapping = defaults.pane_mapping;
        }
        Ok(parsed)
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }

    pub fn remind_interval(&self) -> Duration {
        Duration::from_secs(self.remind_interval_secs)
    }

    pub fn t_idle(&self) -> Duration {
        Duration::from_secs(self.t_idle_secs)
    }

    pub fn t_silent(&self) -> Duration {
        Duration::from_secs(self.t_silent_secs)
    }

    pub fn supervisor_tick(&self) -> Duration {
        Duration::from_secs(self.supervisor_tick_secs)
    }

    pub fn protocol_violation_window(&self) -> Duration {
        Duration::from_secs(self.protocol_violation_window_secs)
    }

    pub fn observer_bee(&self) -> BeeName {
        self.observer_bee
            .parse()
            .unwrap_or(BeeName::Queen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_seed_one_pane_per_real_bee() {
        let config = BeehiveConfig::default();
        assert_eq!(config.pane_mapping.len(), 4);
        for bee in BeeName::REAL_BEES {
            assert!(config.pane_mapping.contains_key(bee.as_str()));
        }
    }

    #[test]
    fn load_without_file_falls_back_to_defaults() {
        let config = BeehiveConfig::load(None).unwrap();
        assert_eq!(config.session_name, "hive");
        assert_eq!(config.t_idle_secs, 120);
    }

    #[test]
    #[serial_test::serial]
    fn load_applies_env_override() {
        std::env::set_var("BEEHIVE_SESSION_NAME", "test-hive");
        let config = BeehiveConfig::load(None).unwrap();
        assert_eq!(config.session_name, "test-hive");
        std::env::remove_var("BEEHIVE_SESSION_NAME");
    }

    #[test]
    fn observer_bee_parses_to_bee_name() {
        let mut config = BeehiveConfig::default();
        config.observer_bee = "developer".to_string();
        assert_eq!(config.observer_bee(), BeeName::Developer);
    }

    #[test]
    fn observer_bee_falls_back_to_queen_on_garbage() {
        let mut config = BeehiveConfig::default();
        config.observer_bee = "not-a-bee".to_string();
        assert_eq!(config.observer_bee(), BeeName::Queen);
    }
}
