//! Pane Addressing (§4.A): the process-wide immutable `bee → pane` table.
//!
//! Loaded once at startup from [`BeehiveConfig::pane_mapping`]; no other
//! component stores a raw pane id, they always go through [`PaneTable`].

use beehive_shared::errors::{BeehiveError, BeehiveResult};
use beehive_shared::model::BeeName;
use beehive_shared::BeehiveConfig;

#[derive(Debug, Clone)]
pub struct PaneTable {
    entries: Vec<(BeeName, String)>,
}

impl PaneTable {
    pub fn from_config(config: &BeehiveConfig) -> Self {
        let mut entries = Vec::new();
        for bee in BeeName::REAL_BEES {
            if let Some(pane) = config.pane_mapping.get(bee.as_str()) {
                entries.push((bee, pane.clone()));
            }
        }
        Self { entries }
    }

    /// Strict lookup: `all` is never a single pane, use [`PaneTable::resolve_all`].
    pub fn resolve(&self, bee: BeeName) -> BeehiveResult<&str> {
        if !bee.is_real_bee() {
            return Err(BeehiveError::InvalidPane(format!(
                "{bee} has no dedicated pane"
            )));
        }
        self.entries
            .iter()
            .find(|(b, _)| *b == bee)
            .map(|(_, pane)| pane.as_str())
            .ok_or_else(|| BeehiveError::InvalidPane(format!("no pane configured for {bee}")))
    }

    /// `all` expands to every bee that has a configured pane.
    pub fn resolve_all(&self) -> Vec<(BeeName, &str)> {
        self.entries.iter().map(|(b, p)| (*b, p.as_str())).collect()
    }

    /// Closed-set membership check for a *pane-addressable* target (a real
    /// bee or the `all` broadcast), independent of whether a pane is
    /// actually configured for `bee`. `system`/`beekeeper` are valid
    /// `BeeName`s but never valid injection targets.
    pub fn validate(bee: BeeName) -> BeehiveResult<()> {
        if bee.is_real_bee() || bee.is_broadcast() {
            Ok(())
        } else {
            Err(BeehiveError::InvalidAssignee(bee.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_returns_configured_pane() {
        let config = BeehiveConfig::default();
        let table = PaneTable::from_config(&config);
        assert_eq!(table.resolve(BeeName::Queen).unwrap(), "hive:0.0");
    }

    #[test]
    fn resolve_rejects_synthetic_senders() {
        let config = BeehiveConfig::default();
        let table = PaneTable::from_config(&config);
        assert!(table.resolve(BeeName::System).is_err());
        assert!(table.resolve(BeeName::All).is_err());
    }

    #[test]
    fn resolve_all_covers_every_real_bee() {
        let config = BeehiveConfig::default();
        let table = PaneTable::from_config(&config);
        assert_eq!(table.resolve_all().len(), 4);
    }

    #[test]
    fn validate_accepts_broadcast_but_not_synthetic() {
        assert!(PaneTable::validate(BeeName::All).is_ok());
        assert!(PaneTable::validate(BeeName::Developer).is_ok());
    }
}
