//! Configuration file loading for the reviewer.
//!
//! Engines are declared once in `review.toml` and picked by name on the
//! command line. Review thresholds and search times live in the
//! `[analysis]` table.

use go_analysis::AnalysisConfig;
use gtp::{EngineKind, SessionConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading or using the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Requested bot was not found in the configuration.
    #[error("Bot not found: {0}")]
    BotNotFound(String),
}

/// A GTP engine the reviewer can launch.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BotConfig {
    /// Output grammar of the engine. Defaults to `leela`.
    #[serde(default)]
    pub kind: EngineKind,
    /// Path to the engine executable.
    pub path: PathBuf,
    /// Command-line arguments. Defaults to GTP mode without pondering.
    #[serde(default)]
    pub arguments: Option<Vec<String>>,
}

impl BotConfig {
    /// Session settings for this engine, before game settings are applied.
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(&self.path, self.kind);
        if let Some(arguments) = &self.arguments {
            config.arguments = arguments.clone();
        }
        config
    }
}

/// Contents of `review.toml`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReviewConfig {
    /// Bot used when none is given on the command line.
    #[serde(default = "default_bot")]
    pub default_bot: String,
    /// Root of the analysis cache.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub bots: HashMap<String, BotConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

fn default_bot() -> String {
    "leela-zero".to_string()
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            default_bot: default_bot(),
            checkpoint_dir: default_checkpoint_dir(),
            log_level: default_log_level(),
            bots: HashMap::new(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl ReviewConfig {
    /// Loads the configuration from `path`, or the defaults if the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Default location of the configuration file, used by the `--config` flag.
    pub fn config_path() -> PathBuf {
        PathBuf::from("review.toml")
    }

    /// Retrieves a bot configuration by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BotNotFound`] if no bot with the given name exists.
    pub fn get_bot(&self, name: &str) -> Result<&BotConfig, ConfigError> {
        self.bots
            .get(name)
            .ok_or_else(|| ConfigError::BotNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
default_bot = "leela"
checkpoint_dir = "/var/cache/go-review"
log_level = "debug"

[bots.leela]
path = "/usr/games/leela"

[bots.leela-zero]
kind = "leela-zero"
path = "/opt/leelaz/leelaz"
arguments = ["--gtp", "--noponder", "-w", "network.gz"]

[analysis]
analyze_time = 5
variations_budget = 12
wipe_comments = true
"#;

        let config: ReviewConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.default_bot, "leela");
        assert_eq!(config.checkpoint_dir, PathBuf::from("/var/cache/go-review"));
        assert_eq!(config.log_level, "debug");

        let leela = config.get_bot("leela").unwrap();
        assert_eq!(leela.kind, EngineKind::Leela);
        assert_eq!(leela.arguments, None);

        let zero = config.get_bot("leela-zero").unwrap();
        assert_eq!(zero.kind, EngineKind::LeelaZero);
        assert_eq!(zero.arguments.as_ref().map(Vec::len), Some(4));

        assert_eq!(config.analysis.analyze_time, 5);
        assert_eq!(config.analysis.variations_budget, 12);
        assert!(config.analysis.wipe_comments);
        // untouched keys keep their defaults
        assert_eq!(config.analysis.variations_time, 15);
    }

    #[test]
    fn test_empty_config_defaults() {
        let config: ReviewConfig = toml::from_str("").unwrap();
        assert_eq!(config, ReviewConfig::default());
        assert_eq!(config.default_bot, "leela-zero");
        assert_eq!(config.checkpoint_dir, PathBuf::from("checkpoints"));
    }

    #[test]
    fn test_config_path() {
        assert_eq!(ReviewConfig::config_path(), PathBuf::from("review.toml"));
    }

    #[test]
    fn test_get_bot_returns_error_for_unknown_bot() {
        let config = ReviewConfig::default();

        match config.get_bot("nonexistent") {
            Err(ConfigError::BotNotFound(name)) => assert_eq!(name, "nonexistent"),
            other => panic!("Expected BotNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ReviewConfig::load(&dir.path().join("review.toml")).unwrap();
        assert_eq!(config, ReviewConfig::default());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("review.toml");
        std::fs::write(&path, "[bots.leela\npath = 1").unwrap();

        assert!(matches!(
            ReviewConfig::load(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_session_config_uses_bot_arguments() {
        let bot = BotConfig {
            kind: EngineKind::LeelaZero,
            path: PathBuf::from("/opt/leelaz"),
            arguments: Some(vec!["--gtp".to_string(), "-w".to_string(), "net.gz".to_string()]),
        };
        let config = bot.session_config();
        assert_eq!(config.kind, EngineKind::LeelaZero);
        assert_eq!(config.executable, PathBuf::from("/opt/leelaz"));
        assert_eq!(config.arguments, vec!["--gtp", "-w", "net.gz"]);

        let bot = BotConfig {
            arguments: None,
            ..bot
        };
        assert_eq!(bot.session_config().arguments, EngineKind::default_arguments());
    }
}
