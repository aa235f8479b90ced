//! Run configuration.
//!
//! Values are resolved in priority order: command-line flag, environment
//! variable, `.env` file in the working directory, built-in default. The
//! `.env` file never overrides variables that are already set.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use crate::debate::engine::{DEFAULT_MAX_ROUNDS, DEFAULT_MIN_ROUNDS};

pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_AGENTS: &str = "TENTHMAN_AGENTS";
pub const ENV_MIN_ROUNDS: &str = "TENTHMAN_MIN_ROUNDS";
pub const ENV_MAX_ROUNDS: &str = "TENTHMAN_MAX_ROUNDS";
pub const ENV_OUTPUT_DIR: &str = "TENTHMAN_OUTPUT_DIR";

/// Default number of debaters.
pub const DEFAULT_AGENTS: usize = 9;

/// Fewest debaters a run accepts.
pub const MIN_AGENTS: usize = 3;

/// Default base directory for run artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Dotenv file read from the working directory.
pub const DOTENV_FILE: &str = ".env";

/// Loads variables from the dotenv file at `path`, if present.
///
/// Variables already set in the environment are kept. Returns whether the
/// file was read.
pub fn load_dotenv(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Loaded .env file");
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable .env file");
            false
        }
    }
}

/// Settings for a debate run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebateSettings {
    /// Debate topic.
    pub topic: String,
    /// Output folder name; derived from the topic when unset.
    pub name: Option<String>,
    /// Number of debaters, not counting the contrarian.
    pub agents: usize,
    /// First round after which consensus is checked.
    pub min_rounds: u32,
    /// Hard cap on free-debate rounds.
    pub max_rounds: u32,
    /// Base directory for run artifacts.
    pub output_dir: PathBuf,
    /// OpenRouter API key.
    pub api_key: Option<String>,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            topic: String::new(),
            name: None,
            agents: DEFAULT_AGENTS,
            min_rounds: DEFAULT_MIN_ROUNDS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            api_key: None,
        }
    }
}

impl DebateSettings {
    /// Creates settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads overrides from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `OPENROUTER_API_KEY`: API key
    /// - `TENTHMAN_AGENTS`: number of debaters (default: 9)
    /// - `TENTHMAN_MIN_ROUNDS`: minimum rounds (default: 5)
    /// - `TENTHMAN_MAX_ROUNDS`: maximum rounds (default: 15)
    /// - `TENTHMAN_OUTPUT_DIR`: output directory (default: output)
    ///
    /// Values are parsed but not validated; call [`Self::validate`] once all
    /// overrides are applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(val) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            settings.api_key = Some(val);
        }

        if let Some(val) = lookup(ENV_AGENTS) {
            settings.agents = parse_env_value(&val, ENV_AGENTS)?;
        }

        if let Some(val) = lookup(ENV_MIN_ROUNDS) {
            settings.min_rounds = parse_env_value(&val, ENV_MIN_ROUNDS)?;
        }

        if let Some(val) = lookup(ENV_MAX_ROUNDS) {
            settings.max_rounds = parse_env_value(&val, ENV_MAX_ROUNDS)?;
        }

        if let Some(val) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            settings.output_dir = PathBuf::from(val);
        }

        Ok(settings)
    }

    /// Validates the settings for a debate run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "topic cannot be empty".to_string(),
            ));
        }

        if self.agents < MIN_AGENTS {
            return Err(ConfigError::ValidationFailed(format!(
                "agent count must be >= {MIN_AGENTS}, got {}",
                self.agents
            )));
        }

        if self.min_rounds == 0 {
            return Err(ConfigError::ValidationFailed(
                "min_rounds must be greater than 0".to_string(),
            ));
        }

        if self.min_rounds > self.max_rounds {
            return Err(ConfigError::ValidationFailed(format!(
                "min_rounds ({}) cannot exceed max_rounds ({})",
                self.min_rounds, self.max_rounds
            )));
        }

        self.api_key()?;
        Ok(())
    }

    /// Returns the API key or the error naming where to set it.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(ENV_API_KEY.to_string()))
    }

    /// Builder method to set the topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Builder method to set the output folder name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method to set the number of debaters.
    pub fn with_agents(mut self, agents: usize) -> Self {
        self.agents = agents;
        self
    }

    /// Builder method to set the round limits.
    pub fn with_rounds(mut self, min_rounds: u32, max_rounds: u32) -> Self {
        self.min_rounds = min_rounds;
        self.max_rounds = max_rounds;
        self
    }

    /// Builder method to set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder method to set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Parses an environment variable value.
fn parse_env_value<T: FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn valid() -> DebateSettings {
        DebateSettings::new()
            .with_topic("Remote work")
            .with_api_key("sk-test")
    }

    #[test]
    fn test_defaults() {
        let settings = DebateSettings::from_lookup(lookup(&[])).expect("defaults");
        assert_eq!(settings.agents, 9);
        assert_eq!(settings.min_rounds, 5);
        assert_eq!(settings.max_rounds, 15);
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let settings = DebateSettings::from_lookup(lookup(&[
            (ENV_API_KEY, "sk-env"),
            (ENV_AGENTS, "4"),
            (ENV_MIN_ROUNDS, " 2 "),
            (ENV_MAX_ROUNDS, "6"),
            (ENV_OUTPUT_DIR, "/tmp/debates"),
        ]))
        .expect("env");

        assert_eq!(settings.api_key().expect("key"), "sk-env");
        assert_eq!(settings.agents, 4);
        assert_eq!(settings.min_rounds, 2);
        assert_eq!(settings.max_rounds, 6);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/debates"));
    }

    #[test]
    fn test_invalid_env_value() {
        let err = DebateSettings::from_lookup(lookup(&[(ENV_AGENTS, "many")]))
            .expect_err("should fail");
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, ENV_AGENTS),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let settings =
            DebateSettings::from_lookup(lookup(&[(ENV_API_KEY, "  ")])).expect("env");
        assert!(matches!(
            settings.api_key(),
            Err(ConfigError::MissingEnvVar(ref key)) if key == ENV_API_KEY
        ));
    }

    #[test]
    fn test_builder_overrides_env() {
        let settings = DebateSettings::from_lookup(lookup(&[(ENV_AGENTS, "4")]))
            .expect("env")
            .with_agents(6);
        assert_eq!(settings.agents, 6);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            valid().with_topic("   "),
            valid().with_agents(2),
            valid().with_rounds(0, 5),
            valid().with_rounds(6, 5),
            DebateSettings::new().with_topic("Remote work"),
        ];
        for settings in cases {
            assert!(settings.validate().is_err(), "{settings:?}");
        }
    }

    #[test]
    fn test_validate_allows_equal_round_limits() {
        assert!(valid().with_rounds(3, 3).validate().is_ok());
    }

    #[test]
    fn test_dotenv_sets_vars_from_file() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join(DOTENV_FILE);
        std::fs::write(&path, "TENTHMAN_TEST_DOTENV_FRESH=from-file\n").expect("write");

        assert!(load_dotenv(&path));
        assert_eq!(
            std::env::var("TENTHMAN_TEST_DOTENV_FRESH").as_deref(),
            Ok("from-file")
        );
    }

    #[test]
    fn test_dotenv_keeps_existing_vars() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join(DOTENV_FILE);
        std::fs::write(&path, "TENTHMAN_TEST_DOTENV_SET=from-file\n").expect("write");
        std::env::set_var("TENTHMAN_TEST_DOTENV_SET", "from-env");

        assert!(load_dotenv(&path));
        assert_eq!(
            std::env::var("TENTHMAN_TEST_DOTENV_SET").as_deref(),
            Ok("from-env")
        );
    }

    #[test]
    fn test_dotenv_missing_file_is_not_an_error() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        assert!(!load_dotenv(dir.path().join(DOTENV_FILE)));
    }
}
