// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Talkie service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default ringtone used for the unread-messages notification.
pub const DEFAULT_RINGTONE_URI: &str = "content://settings/system/notification_sound";

/// Top-level Talkie configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TalkieConfig {
    /// Process-level settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// DTN registration settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Mailbox database and spool directory.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Playback pipeline settings.
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Initial values of the user preferences.
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

/// Process-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Log level filter (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// DTN registration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// Application endpoint name registered with the DTN daemon.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Group endpoint the service subscribes to for broadcast messages.
    /// An empty string disables the group subscription.
    #[serde(default = "default_group_endpoint")]
    pub group_endpoint: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            group_endpoint: default_group_endpoint(),
        }
    }
}

fn default_endpoint() -> String {
    "dtalkie".to_string()
}

fn default_group_endpoint() -> String {
    "dtn://dtalkie.dtn/broadcast".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite mailbox database.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Directory where received voice recordings are written.
    #[serde(default = "default_spool_dir")]
    pub spool_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            spool_dir: default_spool_dir(),
        }
    }
}

impl StorageConfig {
    pub fn spool_path(&self) -> PathBuf {
        PathBuf::from(&self.spool_dir)
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("talkie").join("talkie.db"))
        .unwrap_or_else(|| PathBuf::from("talkie.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_spool_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("talkie").join("messages"))
        .unwrap_or_else(|| PathBuf::from("messages"))
        .to_string_lossy()
        .into_owned()
}

/// Playback pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Upper bound on waiting for the audio device to report completion.
    /// A playback that exceeds it is treated as failed.
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            completion_timeout_secs: default_completion_timeout_secs(),
        }
    }
}

impl PlaybackConfig {
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }
}

fn default_completion_timeout_secs() -> u64 {
    600
}

/// Initial preference values. The running service may change them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PreferencesConfig {
    /// Play received messages automatically.
    #[serde(default)]
    pub autoplay: bool,

    /// Vibrate when the unread notification alerts.
    #[serde(default = "default_vibrate_on_message")]
    pub vibrate_on_message: bool,

    /// Ringtone played when the unread notification alerts.
    #[serde(default = "default_ringtone_uri")]
    pub ringtone_uri: String,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            autoplay: false,
            vibrate_on_message: default_vibrate_on_message(),
            ringtone_uri: default_ringtone_uri(),
        }
    }
}

fn default_vibrate_on_message() -> bool {
    true
}

fn default_ringtone_uri() -> String {
    DEFAULT_RINGTONE_URI.to_string()
}
