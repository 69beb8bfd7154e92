//! Sections of the pipeline configuration file.
//!
//! Every section has defaults, so a config file only needs the values it
//! changes.

use serde::{Deserialize, Serialize};

/// How updates run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Release-data flag for ports that do not set their own.
    pub default_release_data: bool,

    /// Upper bound on continue-executing iterations within one update.
    pub max_continue_iterations: u32,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            default_release_data: false,
            max_continue_iterations: 1024,
        }
    }
}

/// Piece-of-N streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Pieces used by `update_streamed_default`.
    pub default_pieces: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self { default_pieces: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSettings {
    /// Relative tolerance for time snapping algorithms built from config.
    pub snap_tolerance: f64,
}

impl Default for TimeSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Capacity of each subscriber's event channel.
    pub channel_capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
