//! Application configuration loaded from environment variables.

use std::time::Duration;

use clock_in::ClockInConfig;
use marketplace::ApprovalPolicy;

const DEFAULT_CLOCK_IN_TIMEOUT_MS: u64 = 10_000;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `CLOCK_IN_TIMEOUT_MS`: longest wait for a position fix (default: `10000`)
/// - `APPROVAL_BLOCK_ON_CONFLICT`: refuse approvals that fail the conflict
///   recheck (default: `false`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub clock_in_timeout: Duration,
    pub approval_block_on_conflict: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            clock_in_timeout: lookup("CLOCK_IN_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.clock_in_timeout),
            approval_block_on_conflict: lookup("APPROVAL_BLOCK_ON_CONFLICT")
                .and_then(|flag| parse_flag(&flag))
                .unwrap_or(defaults.approval_block_on_conflict),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Clock-in settings for checks made on behalf of a remote device.
    ///
    /// The server cannot prompt the user, so a missing permission is final.
    pub fn clock_in(&self) -> ClockInConfig {
        ClockInConfig {
            location_timeout: self.clock_in_timeout,
            request_permission_if_missing: false,
        }
    }

    pub fn approval_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy {
            block_on_conflict: self.approval_block_on_conflict,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            clock_in_timeout: Duration::from_millis(DEFAULT_CLOCK_IN_TIMEOUT_MS),
            approval_block_on_conflict: false,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.clock_in_timeout, Duration::from_secs(10));
        assert!(!config.approval_block_on_conflict);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reads_overrides() {
        let config = from_pairs(&[
            ("PORT", "8081"),
            ("CLOCK_IN_TIMEOUT_MS", "2500"),
            ("APPROVAL_BLOCK_ON_CONFLICT", "TRUE"),
        ]);
        assert_eq!(config.port, 8081);
        assert_eq!(config.clock_in_timeout, Duration::from_millis(2500));
        assert!(config.approval_policy().block_on_conflict);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = from_pairs(&[
            ("PORT", "not-a-port"),
            ("CLOCK_IN_TIMEOUT_MS", "-5"),
            ("APPROVAL_BLOCK_ON_CONFLICT", "maybe"),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.clock_in_timeout, Duration::from_secs(10));
        assert!(!config.approval_block_on_conflict);
    }

    #[test]
    fn test_clock_in_never_prompts() {
        let config = Config::default();
        assert!(!config.clock_in().request_permission_if_missing);
        assert_eq!(config.clock_in().location_timeout, config.clock_in_timeout);
    }
}
