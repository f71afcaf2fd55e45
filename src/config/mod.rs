//! Client configuration.
//!
//! Settings resolve in three layers: command-line flags first, then
//! `TAWSEEL_*` environment variables (clap folds those into the flags), then
//! the optional TOML file under `~/.tawseel/`. The API address has no
//! default; without one the program refuses to start and prints how to set
//! it, instead of failing later on some arbitrary request.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const CONFIG_DIR: &str = ".tawseel";
pub const CONFIG_FILE: &str = "config.toml";
pub const SESSION_FILE: &str = "session.json";

/// Contents of `~/.tawseel/config.toml`. Every field is optional; flags and
/// environment variables win over the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub watch_interval_secs: Option<u64>,
    pub session_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: FileConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(FileConfig::default())
        }
    }
}

/// Fully resolved settings every command runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub timeout: Duration,
    pub watch_interval: Duration,
    pub session_file: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API address configured")]
    MissingApiUrl,

    #[error("cannot determine a home directory; set session_file in the config file")]
    NoHomeDirectory,

    #[error(transparent)]
    Invalid(#[from] anyhow::Error),
}

impl Settings {
    /// Resolve settings from the flag/env values and the config file.
    ///
    /// `api_url_flag` and `config_flag` arrive with the environment already
    /// folded in by the argument parser.
    pub fn resolve(
        api_url_flag: Option<String>,
        config_flag: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let config_path = config_flag.or_else(default_config_path);
        let file = match &config_path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        // A blank value at one layer falls through to the next.
        let api_url = api_url_flag
            .filter(|url| !url.trim().is_empty())
            .or_else(|| file.api_url.filter(|url| !url.trim().is_empty()))
            .ok_or(ConfigError::MissingApiUrl)?;

        let session_file = match file.session_file {
            Some(path) => path,
            None => home_dir()
                .ok_or(ConfigError::NoHomeDirectory)?
                .join(CONFIG_DIR)
                .join(SESSION_FILE),
        };

        Ok(Settings {
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(30)),
            watch_interval: Duration::from_secs(file.watch_interval_secs.unwrap_or(5).max(1)),
            session_file,
        })
    }
}

/// Static notice shown instead of running a command when no API address is
/// configured.
pub fn missing_api_url_banner() -> &'static str {
    "\
tawseel is not configured: no API address is set.

Set it one of these ways and run the command again:

  flag          tawseel --api-url https://api.example.com <command>
  environment   export TAWSEEL_API_URL=https://api.example.com
  config file   api_url = \"https://api.example.com\" in ~/.tawseel/config.toml"
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

pub fn default_config_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_flag_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "api_url = \"http://from-file:3000\"\n");
        let settings = Settings::resolve(
            Some("http://from-flag:3000".to_string()),
            Some(path),
        )
        .unwrap();
        assert_eq!(settings.api_url, "http://from-flag:3000");
    }

    #[test]
    fn test_file_supplies_url_and_tunables() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "api_url = \"http://api.local/\"\ntimeout_secs = 10\nwatch_interval_secs = 2\nsession_file = \"/tmp/s.json\"\n",
        );
        let settings = Settings::resolve(None, Some(path)).unwrap();
        assert_eq!(settings.api_url, "http://api.local");
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.watch_interval, Duration::from_secs(2));
        assert_eq!(settings.session_file, PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn test_defaults_when_file_is_sparse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "api_url = \"http://api.local\"\nsession_file = \"/tmp/s.json\"\n",
        );
        let settings = Settings::resolve(None, Some(path)).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.watch_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_api_url_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "timeout_secs = 10\n");
        let err = Settings::resolve(None, Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiUrl));
    }

    #[test]
    fn test_blank_api_url_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "api_url = \"  \"\n");
        let err = Settings::resolve(Some("".to_string()), Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiUrl));
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "api_url = [not toml");
        let err = Settings::resolve(None, Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_watch_interval_is_clamped_to_at_least_a_second() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "api_url = \"http://api.local\"\nwatch_interval_secs = 0\nsession_file = \"/tmp/s.json\"\n",
        );
        let settings = Settings::resolve(None, Some(path)).unwrap();
        assert_eq!(settings.watch_interval, Duration::from_secs(1));
    }
}
