use log::{info, warn};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::station::{ProtocolTiming, RetryPolicy, DEFAULT_ATTEMPTS};

const DEFAULT_DEVICE: &str = "/dev/ttyS0";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 300; // 5 minutes
const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct StationConfig {
    pub device: String,
    pub database_url: Option<String>,
    pub poll_interval_secs: u64,
    pub strict_acks: bool,
    pub max_attempts: u32,
    pub response_timeout_ms: u64,
}

impl StationConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let config = Self::from_lookup(|key| env::var(key).ok())?;

        info!(
            "Weather station at '{}', polling every {}s",
            config.device, config.poll_interval_secs
        );
        if config.database_url.is_none() {
            warn!("DATABASE_URL not set, readings will only be logged");
        }

        Ok(config)
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let device = lookup("WS2300_DEVICE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DEVICE.to_string());

        let database_url = lookup("DATABASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let poll_interval_secs =
            parse_or(&lookup, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_interval_secs == 0 {
            return Err("POLL_INTERVAL_SECS must be greater than zero".into());
        }

        let max_attempts = parse_or(&lookup, "WS2300_MAX_ATTEMPTS", DEFAULT_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err("WS2300_MAX_ATTEMPTS must be greater than zero".into());
        }

        let response_timeout_ms = parse_or(
            &lookup,
            "WS2300_RESPONSE_TIMEOUT_MS",
            DEFAULT_RESPONSE_TIMEOUT_MS,
        )?;

        let strict_acks = match lookup("WS2300_STRICT_ACKS") {
            Some(value) => parse_flag(&value)
                .ok_or_else(|| format!("WS2300_STRICT_ACKS: invalid flag '{}'", value))?,
            None => false,
        };

        Ok(StationConfig {
            device,
            database_url,
            poll_interval_secs,
            strict_acks,
            max_attempts,
            response_timeout_ms,
        })
    }

    pub fn protocol_timing(&self) -> ProtocolTiming {
        ProtocolTiming::default()
            .with_response_timeout(Duration::from_millis(self.response_timeout_ms))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::uniform(self.max_attempts)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| format!("{}: invalid value '{}': {}", key, value, e)),
        None => Ok(default),
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

    fn config_from(pairs: &[(&str, &str)]) -> Result<StationConfig, Box<dyn std::error::Error>> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StationConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.device, "/dev/ttyS0");
        assert_eq!(config.database_url, None);
        assert_eq!(config.poll_interval_secs, 300);
        assert_eq!(config.max_attempts, 50);
        assert!(!config.strict_acks);
        assert_eq!(config.protocol_timing(), ProtocolTiming::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn reads_all_variables() {
        let config = config_from(&[
            ("WS2300_DEVICE", "/dev/ttyUSB0"),
            ("DATABASE_URL", "postgres://u@db/weather?sslrootcert=/ca.pem"),
            ("POLL_INTERVAL_SECS", "60"),
            ("WS2300_STRICT_ACKS", "yes"),
            ("WS2300_MAX_ATTEMPTS", "10"),
            ("WS2300_RESPONSE_TIMEOUT_MS", "1000"),
        ])
        .unwrap();

        assert_eq!(config.device, "/dev/ttyUSB0");
        assert!(config.database_url.is_some());
        assert_eq!(config.poll_interval_secs, 60);
        assert!(config.strict_acks);
        assert_eq!(config.retry_policy(), RetryPolicy::uniform(10));
        assert_eq!(
            config.protocol_timing().response_poll_interval,
            Duration::from_millis(50)
        );
    }

    #[test]
    fn rejects_invalid_numbers() {
        assert!(config_from(&[("POLL_INTERVAL_SECS", "soon")]).is_err());
        assert!(config_from(&[("POLL_INTERVAL_SECS", "0")]).is_err());
        assert!(config_from(&[("WS2300_MAX_ATTEMPTS", "-1")]).is_err());
        assert!(config_from(&[("WS2300_STRICT_ACKS", "maybe")]).is_err());
    }

    #[test]
    fn blank_database_url_is_ignored() {
        let config = config_from(&[("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(config.database_url, None);
    }
}
