//! Configuration loading and validation.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Problems found by [`validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("bot.command_prefix must not be empty")]
    EmptyCommandPrefix,
    #[error("bot.command_prefix must not contain spaces")]
    CommandPrefixHasSpaces,
    #[error("roster entry {0:?} is not in name#discriminator form")]
    MalformedRosterEntry(String),
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Dispatch engine configuration, shared by all accounts.
    #[serde(default)]
    pub bot: BotConfig,
    /// Save-data configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Principal the operator console speaks as.
    #[serde(default)]
    pub operator: OperatorConfig,
}

/// Dispatch engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Literal required before a command token when no mention is used.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Whether a bare `@Name` (no discriminator) addresses the bot.
    #[serde(default = "default_true")]
    pub mention_bare_name: bool,
    /// Whitelisted principals, as `name#discriminator` strings.
    #[serde(default)]
    pub roster: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            mention_bare_name: true,
            roster: Vec::new(),
        }
    }
}

/// Save-data configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the save file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

/// The principal the operator console's `say` command injects messages as.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorConfig {
    #[serde(default = "default_operator_name")]
    pub name: String,
    #[serde(default = "default_operator_discriminator")]
    pub discriminator: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            name: default_operator_name(),
            discriminator: default_operator_discriminator(),
        }
    }
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_true() -> bool {
    true
}

fn default_store_path() -> PathBuf {
    PathBuf::from("save.json")
}

fn default_operator_name() -> String {
    "operator".to_string()
}

fn default_operator_discriminator() -> String {
    "0001".to_string()
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults so the daemon can run without one.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Validate a loaded configuration, collecting every problem.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bot.command_prefix.is_empty() {
        errors.push(ValidationError::EmptyCommandPrefix);
    } else if config.bot.command_prefix.contains(' ') {
        errors.push(ValidationError::CommandPrefixHasSpaces);
    }

    for entry in &config.bot.roster {
        let well_formed = entry
            .split_once('#')
            .is_some_and(|(name, disc)| !name.is_empty() && !disc.is_empty());
        if !well_formed {
            errors.push(ValidationError::MalformedRosterEntry(entry.clone()));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
