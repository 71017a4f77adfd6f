//! Configuration loading
//!
//! Recorder settings come from a TOML file resolved in priority order:
//! explicit path, then the `PLAYLOG_CONFIG` environment variable, then the
//! platform config directory (`playlog/config.toml`). When no file exists
//! the compiled defaults apply; every field is individually optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "PLAYLOG_CONFIG";

/// Recorder configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Master switch; when false every playback notification is ignored
    pub enabled: bool,

    /// Tracks shorter than this are never recorded (0 disables the filter)
    pub min_track_seconds: u64,

    /// Percentage of the duration that must play before a track counts.
    /// Out-of-range values behave as 50 at threshold time.
    pub played_percent: u32,

    /// Record remote streams (radio, on-demand services)
    pub include_remote: bool,

    /// Delay before the first flush attempt after a record is queued
    pub queue_flush_delay_secs: u64,

    /// Delay between flush rounds while records remain queued
    pub queue_retry_delay_secs: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_track_seconds: 0,
            played_percent: 50,
            include_remote: true,
            queue_flush_delay_secs: 2,
            queue_retry_delay_secs: 10,
        }
    }
}

impl RecorderConfig {
    /// Load configuration, falling back to defaults when no file is found.
    ///
    /// An explicit path that does not exist or does not parse is an error;
    /// a missing file at the fallback locations is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Parse configuration from a specific TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }
}

/// Platform config file location (`~/.config/playlog/config.toml` on Linux).
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playlog").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RecorderConfig::default();
        assert!(config.enabled);
        assert_eq!(config.min_track_seconds, 0);
        assert_eq!(config.played_percent, 50);
        assert!(config.include_remote);
        assert_eq!(config.queue_retry_delay_secs, 10);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "enabled = true\nmin_track_seconds = 30\nplayed_percent = 75\ninclude_remote = false"
        )
        .unwrap();

        let config = RecorderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.min_track_seconds, 30);
        assert_eq!(config.played_percent, 75);
        assert!(!config.include_remote);
        // Unspecified fields keep their defaults
        assert_eq!(config.queue_flush_delay_secs, 2);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "played_percent = 90").unwrap();

        let config = RecorderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.played_percent, 90);
        assert!(config.enabled);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "played_percent = \"lots\"").unwrap();

        assert!(RecorderConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let result = RecorderConfig::from_file(Path::new("/nonexistent/playlog.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
