//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use ta_core::classify::DEFAULT_CHANNEL_MARKER;
use ta_core::{DISPLAY_TIME_FORMAT, ParseConfig};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Literal marker of analysis-relevant log lines.
    pub channel_marker: String,
    /// `strftime` format for times in command output.
    pub time_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_marker: DEFAULT_CHANNEL_MARKER.to_string(),
            time_format: DISPLAY_TIME_FORMAT.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TA_*)
        figment = figment.merge(Env::prefixed("TA_"));

        figment.extract()
    }

    /// Parser settings derived from this configuration.
    pub fn parse_config(&self) -> ParseConfig {
        ParseConfig {
            channel_marker: self.channel_marker.clone(),
        }
    }
}

/// Returns the platform-specific config directory for ta.
///
/// On Linux: `~/.config/ta`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ta"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_default_config_uses_analysis_marker() {
        let config = Config::default();
        assert_eq!(config.channel_marker, "ANALYSE -");
        assert_eq!(config.time_format, "%Y-%m-%d %H:%M:%S");
    }

    #[test]
    fn test_parse_config_carries_marker() {
        let config = Config {
            channel_marker: "TRACE -".to_string(),
            ..Config::default()
        };
        assert_eq!(config.parse_config().channel_marker, "TRACE -");
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"time_format = "%H:%M:%S""#).unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.time_format, "%H:%M:%S");
    }

    #[test]
    fn test_dirs_config_path_ends_with_ta() {
        if let Some(path) = dirs_config_path() {
            assert_eq!(path.file_name().unwrap(), "ta");
        }
    }
}
