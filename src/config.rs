use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_ENV: &str = "NOTES_CONFIG";
const CONFIG_DIR: &str = "notes-tui";
const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub editor: EditorConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo steps kept before the oldest is dropped.
    pub history_depth: usize,
    /// Typing closer together than this collapses into one undo step.
    pub history_group_delay_ms: u64,
    /// How many characters before the cursor input rules get to see.
    pub input_rule_lookbehind: usize,
    /// Column to wrap the text at. Defaults to the terminal width.
    pub wrap_width: Option<usize>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: 100,
            history_group_delay_ms: 500,
            input_rule_lookbehind: 500,
            wrap_width: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives used when `NOTES_LOG` is unset.
    pub filter: Option<String>,
    pub directory: Option<PathBuf>,
}

impl Config {
    /// `$NOTES_CONFIG`, falling back to `<config dir>/notes-tui/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Loads the default config file; a missing file yields the defaults.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("failed to parse config JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.editor.history_depth, 100);
        assert_eq!(config.editor.history_group_delay_ms, 500);
        assert_eq!(config.editor.input_rule_lookbehind, 500);
        assert_eq!(config.editor.wrap_width, None);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"{"editor": {"history_depth": 5, "wrap_width": 72}, "log": {"filter": "notes_tui=debug"}}"#,
        )
        .unwrap();
        assert_eq!(config.editor.history_depth, 5);
        assert_eq!(config.editor.wrap_width, Some(72));
        assert_eq!(config.editor.input_rule_lookbehind, 500);
        assert_eq!(config.log.filter.as_deref(), Some("notes_tui=debug"));
        assert_eq!(config.log.directory, None);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.json"));
    }
}
