// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as well-formed endpoints, non-empty paths and positive timeouts.

use talkie_core::Endpoint;

use crate::diagnostic::ConfigError;
use crate::model::TalkieConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TalkieConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.service.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::invalid(
            "service.log_level",
            format!("unknown level `{}`", config.service.log_level),
        ));
    }

    // The application endpoint is a bare name, the daemon prefixes the node id.
    let endpoint = config.network.endpoint.trim();
    if endpoint.is_empty() {
        errors.push(ConfigError::invalid("network.endpoint", "must not be empty"));
    } else if endpoint.contains(':') {
        errors.push(ConfigError::invalid(
            "network.endpoint",
            format!("`{endpoint}` carries a scheme"),
        ));
    } else if endpoint.contains(char::is_whitespace) {
        errors.push(ConfigError::invalid(
            "network.endpoint",
            format!("`{endpoint}` contains whitespace"),
        ));
    }

    let group = config.network.group_endpoint.trim();
    if !group.is_empty() && group.parse::<Endpoint>().is_err() {
        errors.push(ConfigError::invalid(
            "network.group_endpoint",
            format!("`{group}` is not a dtn: or ipn: endpoint"),
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.database_path", "must not be empty"));
    }

    if config.storage.spool_dir.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.spool_dir", "must not be empty"));
    }

    if config.playback.completion_timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "playback.completion_timeout_secs",
            "must be at least 1",
        ));
    }

    if config.preferences.ringtone_uri.trim().is_empty() {
        errors.push(ConfigError::invalid("preferences.ringtone_uri", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { key, .. } if key.ends_with(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = TalkieConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TalkieConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn zero_completion_timeout_fails_validation() {
        let mut config = TalkieConfig::default();
        config.playback.completion_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "completion_timeout_secs"));
    }

    #[test]
    fn malformed_group_endpoint_fails_validation() {
        let mut config = TalkieConfig::default();
        config.network.group_endpoint = "broadcast".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "group_endpoint"));
    }

    #[test]
    fn empty_group_endpoint_is_allowed() {
        let mut config = TalkieConfig::default();
        config.network.group_endpoint = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn endpoint_with_scheme_fails_validation() {
        let mut config = TalkieConfig::default();
        config.network.endpoint = "dtn://node/dtalkie".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "network.endpoint"));
        assert!(errors[0].to_string().contains("carries a scheme"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = TalkieConfig::default();
        config.service.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "log_level"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = TalkieConfig::default();
        config.storage.database_path = " ".to_string();
        config.storage.spool_dir = "".to_string();
        config.preferences.ringtone_uri = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
