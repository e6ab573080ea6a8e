//! Configuration management for the voxchat client
//!
//! Precedence, highest first: CLI flags, then the TOML config file, then
//! built-in defaults. Nothing here persists any state between runs; the
//! config file is read once at startup.

pub mod file;

use std::path::{Path, PathBuf};

use crate::Result;

/// Default agent base URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Command-line overrides applied on top of the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// Agent base URL
    pub server_url: Option<String>,
    /// Explicit session identifier
    pub session_id: Option<String>,
    /// Local fallback audio file
    pub fallback_audio: Option<PathBuf>,
}

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the chat agent
    pub server_url: String,

    /// Explicit session identifier, if any; `None` generates one at startup
    pub session_id: Option<String>,

    /// Local fallback audio file overriding the server asset
    pub fallback_audio: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            session_id: None,
            fallback_audio: None,
        }
    }
}

impl Config {
    /// Load configuration from the default file location with CLI overrides
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed
    pub fn load(overrides: Overrides) -> Result<Self> {
        match file::default_path() {
            Some(path) => Self::load_from(&path, overrides),
            None => Ok(Self::merge(file::VoxchatConfigFile::default(), overrides)),
        }
    }

    /// Load configuration from an explicit file path with CLI overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be parsed
    pub fn load_from(path: &Path, overrides: Overrides) -> Result<Self> {
        let parsed = file::load(path)?;
        Ok(Self::merge(parsed, overrides))
    }

    fn merge(parsed: file::VoxchatConfigFile, overrides: Overrides) -> Self {
        let defaults = Self::default();
        Self {
            server_url: overrides
                .server_url
                .or(parsed.server_url)
                .unwrap_or(defaults.server_url),
            session_id: overrides.session_id.or(parsed.session_id),
            fallback_audio: overrides.fallback_audio.or(parsed.fallback_audio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::merge(file::VoxchatConfigFile::default(), Overrides::default());
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert!(config.session_id.is_none());
        assert!(config.fallback_audio.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let parsed = file::VoxchatConfigFile {
            server_url: Some("http://file:1".to_string()),
            session_id: Some("from-file".to_string()),
            fallback_audio: None,
        };
        let config = Config::merge(parsed, Overrides::default());
        assert_eq!(config.server_url, "http://file:1");
        assert_eq!(config.session_id.as_deref(), Some("from-file"));
    }

    #[test]
    fn cli_overrides_file() {
        let parsed = file::VoxchatConfigFile {
            server_url: Some("http://file:1".to_string()),
            session_id: Some("from-file".to_string()),
            fallback_audio: None,
        };
        let overrides = Overrides {
            server_url: Some("http://cli:2".to_string()),
            session_id: None,
            fallback_audio: Some(PathBuf::from("/tmp/fallback.wav")),
        };
        let config = Config::merge(parsed, overrides);
        assert_eq!(config.server_url, "http://cli:2");
        assert_eq!(config.session_id.as_deref(), Some("from-file"));
        assert_eq!(
            config.fallback_audio.as_deref(),
            Some(Path::new("/tmp/fallback.wav"))
        );
    }

    #[test]
    fn load_from_reads_file_with_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "session_id = \"abc123\"\n").unwrap();

        let config = Config::load_from(&path, Overrides::default()).unwrap();
        assert_eq!(config.session_id.as_deref(), Some("abc123"));
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }
}
