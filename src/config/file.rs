//! TOML configuration file loading
//!
//! Supports `~/.config/voxchat/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VoxchatConfigFile {
    /// Base URL of the chat agent (e.g. `http://localhost:8000`)
    pub server_url: Option<String>,

    /// Fixed session identifier; omit to generate one per run
    pub session_id: Option<String>,

    /// Local file to play instead of fetching the server fallback asset
    pub fallback_audio: Option<PathBuf>,
}

/// Default config file location: `~/.config/voxchat/config.toml`
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voxchat").join("config.toml"))
}

/// Load a config file, treating a missing file as empty
///
/// # Errors
///
/// Returns error if the file exists but cannot be read or parsed
pub fn load(path: &Path) -> Result<VoxchatConfigFile> {
    if !path.exists() {
        return Ok(VoxchatConfigFile::default());
    }
    let raw = std::fs::read_to_string(path)?;
    let parsed = toml::from_str(&raw)?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_overlay() {
        let parsed = load(Path::new("/nonexistent/voxchat/config.toml")).unwrap();
        assert!(parsed.server_url.is_none());
        assert!(parsed.session_id.is_none());
    }

    #[test]
    fn partial_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server_url = \"http://example.com:9000\"\n").unwrap();

        let parsed = load(&path).unwrap();
        assert_eq!(parsed.server_url.as_deref(), Some("http://example.com:9000"));
        assert!(parsed.fallback_audio.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server_url = [not toml").unwrap();

        assert!(load(&path).is_err());
    }
}
