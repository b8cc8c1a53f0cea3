// Config module
// ~/.ccmcp/config.toml and the document locations derived from it

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Claude's config file holding `mcpServers`.
    pub host_config: Option<String>,
    pub disabled_store: Option<String>,
    pub journal: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    pub color: Option<bool>,
    /// Ask before toggling from the interactive menu.
    pub confirm_toggle: Option<bool>,
}

/// Where the three documents live once settings and flags are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub host_config: PathBuf,
    pub disabled_store: PathBuf,
    pub journal: PathBuf,
}

impl StorePaths {
    pub fn under_home(home: &Path) -> Self {
        let data = home.join(".ccmcp");
        Self {
            host_config: home.join(".claude.json"),
            disabled_store: data.join("disabled.json"),
            journal: data.join("journal.jsonl"),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut settings: Settings = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        settings.expand_env_vars();
        Ok(settings)
    }

    /// Reads `~/.ccmcp/config.toml` then `./.ccmcp/config.toml`; keys set in
    /// the later file win.
    pub fn discover() -> anyhow::Result<Self> {
        let mut candidates = Vec::new();
        if let Ok(home) = home_dir() {
            candidates.push(home.join(".ccmcp").join("config.toml"));
        }
        candidates.push(PathBuf::from(".").join(".ccmcp").join("config.toml"));

        let mut settings = Settings::default();
        for path in candidates {
            if path.exists() {
                settings.merge(Settings::load(&path)?);
            }
        }
        Ok(settings)
    }

    pub fn merge(&mut self, other: Settings) {
        if other.paths.host_config.is_some() {
            self.paths.host_config = other.paths.host_config;
        }
        if other.paths.disabled_store.is_some() {
            self.paths.disabled_store = other.paths.disabled_store;
        }
        if other.paths.journal.is_some() {
            self.paths.journal = other.paths.journal;
        }
        if other.display.color.is_some() {
            self.display.color = other.display.color;
        }
        if other.display.confirm_toggle.is_some() {
            self.display.confirm_toggle = other.display.confirm_toggle;
        }
    }

    pub fn store_paths(&self, home: &Path) -> StorePaths {
        let defaults = StorePaths::under_home(home);
        let resolve = |value: &Option<String>, fallback: PathBuf| {
            value
                .as_deref()
                .map(|v| expand_home(v, home))
                .unwrap_or(fallback)
        };
        StorePaths {
            host_config: resolve(&self.paths.host_config, defaults.host_config),
            disabled_store: resolve(&self.paths.disabled_store, defaults.disabled_store),
            journal: resolve(&self.paths.journal, defaults.journal),
        }
    }

    fn expand_env_vars(&mut self) {
        for value in [
            &mut self.paths.host_config,
            &mut self.paths.disabled_store,
            &mut self.paths.journal,
        ] {
            if let Some(path) = value {
                *path = expand_vars(path);
            }
        }
    }
}

pub fn home_dir() -> anyhow::Result<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("HOME not set"))
}

/// `~` or `~/...` relative to `home`; anything else as given.
pub fn expand_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    match value.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(value),
    }
}

/// Substitutes `$NAME` and `${NAME}` from the environment. Unset variables
/// and unterminated `${` are left as written.
fn expand_vars(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(at) = rest.find('$') {
        output.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(close) => (&braced[..close], close + 2),
                None => ("", 0),
            },
            None => {
                let len = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..len], len)
            }
        };

        match std::env::var(name) {
            Ok(value) if !name.is_empty() => output.push_str(&value),
            _ => output.push_str(&rest[at..at + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn env_vars_expand_in_both_forms() {
        std::env::set_var("CCMCP_TEST_DIR", "/data");
        assert_eq!(
            expand_vars("$CCMCP_TEST_DIR/a/${CCMCP_TEST_DIR}"),
            "/data/a//data"
        );
        std::env::remove_var("CCMCP_TEST_DIR");
        assert_eq!(
            expand_vars("${CCMCP_TEST_DIR}/x $ y"),
            "${CCMCP_TEST_DIR}/x $ y"
        );
        assert_eq!(expand_vars("${open"), "${open");
    }

    #[test]
    fn defaults_live_under_home() {
        let home = Path::new("/home/u");
        let paths = Settings::default().store_paths(home);
        assert_eq!(paths.host_config, home.join(".claude.json"));
        assert_eq!(paths.disabled_store, home.join(".ccmcp/disabled.json"));
        assert_eq!(paths.journal, home.join(".ccmcp/journal.jsonl"));
    }

    #[test]
    #[serial]
    fn load_expands_paths_and_tilde() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::env::set_var("CCMCP_TEST_STATE", "/var/state");
        std::fs::write(
            &path,
            r#"
[paths]
host_config = "~/alt/claude.json"
journal = "$CCMCP_TEST_STATE/journal.jsonl"

[display]
color = false
"#,
        )
        .expect("write");

        let settings = Settings::load(&path).expect("load");
        std::env::remove_var("CCMCP_TEST_STATE");
        let home = Path::new("/home/u");
        let paths = settings.store_paths(home);
        assert_eq!(paths.host_config, home.join("alt/claude.json"));
        assert_eq!(paths.journal, PathBuf::from("/var/state/journal.jsonl"));
        assert_eq!(paths.disabled_store, home.join(".ccmcp/disabled.json"));
        assert_eq!(settings.display.color, Some(false));
    }

    #[test]
    fn merge_keeps_unset_keys() {
        let mut base = Settings::default();
        base.paths.journal = Some("/a".to_string());
        base.display.color = Some(true);

        let mut local = Settings::default();
        local.paths.host_config = Some("/b".to_string());
        local.display.color = Some(false);
        base.merge(local);

        assert_eq!(base.paths.journal.as_deref(), Some("/a"));
        assert_eq!(base.paths.host_config.as_deref(), Some("/b"));
        assert_eq!(base.display.color, Some(false));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[paths\nhost_config = 1").expect("write");
        assert!(Settings::load(&path).is_err());
    }
}
