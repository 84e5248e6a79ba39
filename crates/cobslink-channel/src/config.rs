use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChannelError, Result};

/// Retry and timeout settings for a [`ReliableChannel`](crate::ReliableChannel).
///
/// Serialized with durations as integer milliseconds:
/// ```json
/// { "attempts": 3, "retry_delay_ms": 10, "read_timeout_ms": 1000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Full write/read cycles per exchange. Must be at least 1.
    pub attempts: u32,
    /// Pause between a failed attempt and the next one.
    #[serde(rename = "retry_delay_ms", with = "millis")]
    pub retry_delay: Duration,
    /// Per-attempt deadline for a complete response. Must be non-zero.
    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_delay: Duration::from_millis(10),
            read_timeout: Duration::from_secs(1),
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(ChannelError::InvalidConfig(
                "attempts must be at least 1".to_string(),
            ));
        }
        if self.read_timeout.is_zero() {
            return Err(ChannelError::InvalidConfig(
                "read_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| ChannelError::InvalidConfig(format!("parse failed: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            ChannelError::InvalidConfig(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(10));
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_attempts_rejected() {
        let config = ChannelConfig {
            attempts: 0,
            ..ChannelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChannelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_read_timeout_rejected() {
        let config = ChannelConfig {
            read_timeout: Duration::ZERO,
            ..ChannelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChannelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn json_uses_millisecond_fields() {
        let config = ChannelConfig {
            attempts: 5,
            retry_delay: Duration::from_millis(25),
            read_timeout: Duration::from_millis(750),
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"attempts": 5, "retry_delay_ms": 25, "read_timeout_ms": 750})
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = ChannelConfig::from_json(r#"{"attempts": 7}"#).unwrap();
        assert_eq!(config.attempts, 7);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn json_is_validated() {
        assert!(ChannelConfig::from_json(r#"{"read_timeout_ms": 0}"#).is_err());
        assert!(ChannelConfig::from_json(r#"{"attempt": 2}"#).is_err());
        assert!(ChannelConfig::from_json("not json").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ChannelConfig::load("/nonexistent/cobslink.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cobslink.json"));
    }
}
