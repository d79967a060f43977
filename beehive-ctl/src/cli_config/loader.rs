//! Discovery and loading of `hive/session.toml`.
//!
//! Checked relative to the configured `db_path`'s directory first (the
//! natural place to keep session material alongside the database this
//! session populates), falling back to `./session.toml` in the current
//! directory.

use std::path::{Path, PathBuf};

use super::SessionSpec;

const SESSION_FILENAME: &str = "session.toml";

/// Load the session spec from the first discovered location, or return
/// defaults (an empty session — `init` will spawn nothing).
pub(crate) fn load_session_spec(db_path: &Path, explicit: Option<&Path>) -> SessionSpec {
    let candidate = explicit
        .map(PathBuf::from)
        .or_else(|| db_path.parent().map(|dir| dir.join(SESSION_FILENAME)))
        .filter(|p| p.is_file())
        .or_else(|| {
            let local = PathBuf::from(SESSION_FILENAME);
            local.is_file().then_some(local)
        });

    let Some(path) = candidate else {
        tracing::debug!("no session.toml found, init will spawn no bees");
        return SessionSpec::default();
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(spec) => {
                tracing::debug!(?path, "loaded session spec");
                spec
            }
            Err(e) => {
                tracing::warn!(?path, error = %e, "failed to parse session spec, using defaults");
                SessionSpec::default()
            }
        },
        Err(e) => {
            tracing::warn!(?path, error = %e, "failed to read session spec, using defaults");
            SessionSpec::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_returns_defaults() {
        let spec = load_session_spec(Path::new("/nonexistent/hive.db"), None);
        assert!(spec.commands.is_empty());
        assert_eq!(spec.ack_pattern, "ROLE ACKNOWLEDGED");
    }

    #[test]
    fn explicit_path_overrides_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
ack-pattern = "OK"
[commands]
queen = "claude --role queen"
"#,
        )
        .unwrap();

        let spec = load_session_spec(Path::new("/nonexistent/hive.db"), Some(&path));
        assert_eq!(spec.ack_pattern, "OK");
        assert_eq!(spec.commands.get("queen").map(String::as_str), Some("claude --role queen"));
    }
}
