//! Configuration for vispipe-rs
//!
//! [`PipelineConfig`] holds coordinator defaults: release-data behaviour,
//! iteration limits, streaming, time snapping tolerance, event channel size
//! and the log filter.
//!
//! # Files
//!
//! Config files are TOML (`.toml`) or JSON (anything else), chosen by
//! extension. The default file lives in the platform data directory:
//!
//! - **Linux**: `~/.local/share/dev.vispipe.vispipe-rs/pipeline.toml`
//! - **macOS**: `~/Library/Application Support/dev.vispipe.vispipe-rs/pipeline.toml`
//! - **Windows**: `%APPDATA%\dev.vispipe.vispipe-rs\pipeline.toml`
//!
//! # Example
//!
//! ```ignore
//! use vispipe_rs::config::PipelineConfig;
//!
//! let mut config = PipelineConfig::load_or_default("pipeline.toml");
//! config.streaming.default_pieces = 8;
//! config.save("pipeline.toml")?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, VisPipeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.vispipe.vispipe-rs";

/// Default config filename
pub const CONFIG_FILE: &str = "pipeline.toml";

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path of the default config file
pub fn default_config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

/// Coordinator defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub execution: ExecutionSettings,
    pub streaming: StreamingSettings,
    pub time: TimeSettings,
    pub events: EventSettings,
    pub logging: LoggingSettings,
}

impl PipelineConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisPipeError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = if is_toml(path) {
            toml::from_str(&content).map_err(|e| {
                VisPipeError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| {
                VisPipeError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to disk, TOML or JSON by extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VisPipeError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = if is_toml(path) {
            toml::to_string_pretty(self)
                .map_err(|e| VisPipeError::Config(format!("Failed to serialize config: {}", e)))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| VisPipeError::Config(format!("Failed to serialize config: {}", e)))?
        };

        std::fs::write(path, content).map_err(|e| {
            VisPipeError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject values the coordinator cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.execution.max_continue_iterations == 0 {
            return Err(VisPipeError::Config(
                "execution.max_continue_iterations must be at least 1".to_string(),
            ));
        }
        if self.streaming.default_pieces == 0 {
            return Err(VisPipeError::Config(
                "streaming.default_pieces must be at least 1".to_string(),
            ));
        }
        if !self.time.snap_tolerance.is_finite() || self.time.snap_tolerance < 0.0 {
            return Err(VisPipeError::Config(format!(
                "time.snap_tolerance must be a non-negative number, got {}",
                self.time.snap_tolerance
            )));
        }
        if self.events.channel_capacity == 0 {
            return Err(VisPipeError::Config(
                "events.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_pieces() {
        let mut config = PipelineConfig::default();
        config.streaming.default_pieces = 0;
        assert!(matches!(config.validate(), Err(VisPipeError::Config(_))));
    }

    #[test]
    fn test_toml_sections() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [execution]
            default_release_data = true

            [streaming]
            default_pieces = 4
            "#,
        )
        .unwrap();
        assert!(config.execution.default_release_data);
        assert_eq!(config.execution.max_continue_iterations, 1024);
        assert_eq!(config.streaming.default_pieces, 4);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_is_toml() {
        assert!(is_toml(Path::new("a/pipeline.toml")));
        assert!(is_toml(Path::new("PIPELINE.TOML")));
        assert!(!is_toml(Path::new("pipeline.json")));
        assert!(!is_toml(Path::new("pipeline")));
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with(Path::new(APP_ID).join(CONFIG_FILE)));
        }
    }
}
