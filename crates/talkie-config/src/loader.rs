// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./talkie.toml` > `~/.config/talkie/talkie.toml` > `/etc/talkie/talkie.toml`
//! with environment variable overrides via `TALKIE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::TalkieConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/talkie/talkie.toml` (system-wide)
/// 3. `~/.config/talkie/talkie.toml` (user XDG config)
/// 4. `./talkie.toml` (local directory)
/// 5. `TALKIE_*` environment variables
pub fn load_config() -> Result<TalkieConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<TalkieConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TalkieConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TalkieConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TalkieConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TalkieConfig::default()))
        .merge(Toml::file("/etc/talkie/talkie.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("talkie/talkie.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("talkie.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TALKIE_PLAYBACK_COMPLETION_TIMEOUT_SECS` must map to
/// `playback.completion_timeout_secs`.
fn env_provider() -> Env {
    Env::prefixed("TALKIE_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to its dotted config key.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 5] = ["service", "network", "storage", "playback", "preferences"];

    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
