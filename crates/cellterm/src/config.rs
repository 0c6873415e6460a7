//! Runtime configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// cellterm configuration, loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell to run; falls back to $SHELL, then /bin/sh.
    pub shell: Option<String>,

    /// Show the terminal cursor inside the window.
    pub show_cursor: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            show_cursor: true,
        }
    }
}

impl Config {
    /// Load from an explicit path, or ~/.config/cellterm/config.toml.
    /// A missing file is the default config; a malformed file is
    /// reported and ignored.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };

        if let Ok(contents) = std::fs::read_to_string(&path) {
            match toml::from_str(&contents) {
                Ok(config) => return config,
                Err(e) => {
                    eprintln!("warning: failed to parse {}: {}", path.display(), e);
                }
            }
        }
        Self::default()
    }

    fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("cellterm")
            .join("config.toml")
    }

    /// The shell to spawn.
    pub fn resolve_shell(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/sh".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.shell.is_none());
        assert!(config.show_cursor);
    }

    #[test]
    fn fields_parse() {
        let config: Config = toml::from_str(
            r#"
            shell = "/usr/bin/fish"
            show_cursor = false
            "#,
        )
        .unwrap();
        assert_eq!(config.shell.as_deref(), Some("/usr/bin/fish"));
        assert!(!config.show_cursor);
    }

    #[test]
    fn configured_shell_wins_over_environment() {
        let config = Config {
            shell: Some("/bin/dash".into()),
            ..Config::default()
        };
        assert_eq!(config.resolve_shell(), "/bin/dash");
    }
}
