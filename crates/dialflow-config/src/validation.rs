// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic validation of configuration values.
//!
//! Runs after deserialization succeeds. Checks constraints that serde
//! cannot express: non-empty paths, valid bind addresses, finite timeouts.

use std::net::IpAddr;

use crate::diagnostic::ConfigError;
use crate::model::DialflowConfig;

/// Validate semantic constraints on a deserialized configuration.
///
/// Returns all violations at once rather than stopping at the first, so
/// the operator can fix the whole file in one pass.
pub fn validate(config: &DialflowConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.provider.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "provider.base_url must not be empty".to_string(),
        });
    } else if !config.provider.base_url.starts_with("http://")
        && !config.provider.base_url.starts_with("https://")
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "provider.base_url must start with http:// or https://, got `{}`",
                config.provider.base_url
            ),
        });
    }

    if config.provider.handshake_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "provider.handshake_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.provider.stop_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "provider.stop_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.gateway.enabled {
        if config.gateway.port == 0 {
            errors.push(ConfigError::Validation {
                message: "gateway.port must not be 0".to_string(),
            });
        }
        if !is_valid_host(&config.gateway.host) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "gateway.host `{}` is not a valid IP address or hostname",
                    config.gateway.host
                ),
            });
        }
    }

    let level = config.agent.log_level.as_str();
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level `{level}` is not one of: trace, debug, info, warn, error"
            ),
        });
    }

    errors
}

/// Check whether a string is a plausible bind host: an IP address or a
/// hostname made of alphanumeric labels separated by dots.
fn is_valid_host(host: &str) -> bool {
    if host.is_empty() {
        return false;
    }
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DialflowConfig::default();
        assert!(validate(&config).is_empty());
    }

    #[test]
    fn empty_database_path_is_rejected() {
        let mut config = DialflowConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("database_path"));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut config = DialflowConfig::default();
        config.provider.handshake_timeout_secs = 0;
        config.provider.stop_timeout_secs = 0;
        let errors = validate(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn port_zero_rejected_only_when_gateway_enabled() {
        let mut config = DialflowConfig::default();
        config.gateway.port = 0;
        assert_eq!(validate(&config).len(), 1);

        config.gateway.enabled = false;
        assert!(validate(&config).is_empty());
    }

    #[test]
    fn bad_host_is_rejected() {
        let mut config = DialflowConfig::default();
        config.gateway.host = "not a host!".to_string();
        let errors = validate(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("gateway.host"));
    }

    #[test]
    fn ipv6_and_hostname_are_accepted() {
        let mut config = DialflowConfig::default();
        config.gateway.host = "::1".to_string();
        assert!(validate(&config).is_empty());
        config.gateway.host = "dialer.internal.example.com".to_string();
        assert!(validate(&config).is_empty());
    }

    #[test]
    fn scheme_less_base_url_is_rejected() {
        let mut config = DialflowConfig::default();
        config.provider.base_url = "api.voice.example.com".to_string();
        let errors = validate(&config);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut config = DialflowConfig::default();
        config.agent.log_level = "loud".to_string();
        let errors = validate(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("log_level"));
    }
}
