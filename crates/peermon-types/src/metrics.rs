use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One telemetry record produced by a peer.
///
/// The payload is carried opaquely from the wire to the exporter; the monitor
/// never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl Snapshot {
    pub fn new(timestamp: DateTime<Utc>, payload: serde_json::Value) -> Self {
        Self { timestamp, payload }
    }
}

/// A measured throughput pair for one peer, in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandwidthSample {
    pub download: f64,
    pub upload: f64,
    pub timestamp: DateTime<Utc>,
}

/// Static information a peer reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub numcpus: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_serde_preserves_payload() {
        let snap = Snapshot::new(
            Utc::now(),
            json!({"kind": "ping", "rtt_ms": 12, "nested": {"a": [1, 2, 3]}}),
        );
        let encoded = serde_json::to_string(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&encoded).unwrap();
        assert_eq!(back, snap);
        assert_eq!(back.payload["nested"]["a"][2], json!(3));
    }

    #[test]
    fn test_bandwidth_sample_serde() {
        let sample = BandwidthSample {
            download: 1_048_576.0,
            upload: 262_144.5,
            timestamp: Utc::now(),
        };
        let encoded = serde_json::to_string(&sample).unwrap();
        let back: BandwidthSample = serde_json::from_str(&encoded).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_system_info_field_names() {
        let info = SystemInfo {
            os: "linux".into(),
            arch: "x86_64".into(),
            numcpus: 16,
        };
        let v: serde_json::Value = serde_json::to_value(&info).unwrap();
        assert_eq!(v["os"], "linux");
        assert_eq!(v["numcpus"], 16);
    }
}
