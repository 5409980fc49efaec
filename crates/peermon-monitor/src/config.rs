use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the monitor's collection schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay between successful telemetry collections on one peer.
    #[serde(with = "duration_secs")]
    pub collect_period: Duration,

    /// Delay between successful bandwidth collections on one peer.
    #[serde(with = "duration_secs")]
    pub bandwidth_period: Duration,

    /// Cumulative per-peer failure count past which the peer is removed.
    pub max_failed_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            collect_period: Duration::from_secs(120),
            bandwidth_period: Duration::from_secs(600),
            max_failed_attempts: 3,
        }
    }
}

/// Serde helper that serialises `Duration` as floating-point seconds.
mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.collect_period, Duration::from_secs(120));
        assert_eq!(config.bandwidth_period, Duration::from_secs(600));
        assert_eq!(config.max_failed_attempts, 3);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = MonitorConfig {
            collect_period: Duration::from_millis(1500),
            bandwidth_period: Duration::from_secs(30),
            max_failed_attempts: 5,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: MonitorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.collect_period, config.collect_period);
        assert_eq!(back.bandwidth_period, config.bandwidth_period);
        assert_eq!(back.max_failed_attempts, 5);
    }

    #[test]
    fn test_durations_serialize_as_seconds() {
        let config = MonitorConfig {
            collect_period: Duration::from_millis(2500),
            ..MonitorConfig::default()
        };
        let v: serde_json::Value = serde_json::to_value(&config).unwrap();
        assert_eq!(v["collect_period"], serde_json::json!(2.5));
    }
}
