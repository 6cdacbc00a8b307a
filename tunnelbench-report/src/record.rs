//! Trial record data structures.

use serde::{Deserialize, Serialize};
use tunnelbench_core::TrialResult;

/// One trial as persisted in the JSON report.
///
/// Field names and nullability are the harness's wire format; RSS fields are
/// `null` when sampling was unavailable, `error` is `null` on success. When
/// `error` is set, the numeric fields carry no meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Cipher exercised by the trial.
    pub cipher: String,
    /// Sender-side bandwidth in Mbps.
    pub bandwidth_mbps: f64,
    /// Transfer duration in seconds.
    pub duration_sec: f64,
    /// Bytes streamed into the tunnel.
    pub bytes_transferred: u64,
    /// Server-role RSS before the transfer in KB.
    pub server_rss_before_kb: Option<u64>,
    /// Server-role RSS after the transfer in KB.
    pub server_rss_after_kb: Option<u64>,
    /// Tunnel-role RSS before the transfer in KB.
    pub tunnel_rss_before_kb: Option<u64>,
    /// Tunnel-role RSS after the transfer in KB.
    pub tunnel_rss_after_kb: Option<u64>,
    /// What ended the trial early, if anything.
    pub error: Option<String>,
}

impl From<&TrialResult> for TrialRecord {
    fn from(result: &TrialResult) -> Self {
        Self {
            cipher: result.cipher.clone(),
            bandwidth_mbps: result.bandwidth_mbps,
            duration_sec: result.duration.as_secs_f64(),
            bytes_transferred: result.bytes_transferred,
            server_rss_before_kb: result.server_rss_before_kb,
            server_rss_after_kb: result.server_rss_after_kb,
            tunnel_rss_before_kb: result.tunnel_rss_before_kb,
            tunnel_rss_after_kb: result.tunnel_rss_after_kb,
            error: result.error.as_ref().map(|error| error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passed(cipher: &str, mbps: f64) -> TrialRecord {
        TrialRecord {
            cipher: cipher.to_string(),
            bandwidth_mbps: mbps,
            duration_sec: 1.5,
            bytes_transferred: 100 * 1024 * 1024,
            server_rss_before_kb: Some(2_048),
            server_rss_after_kb: Some(2_560),
            tunnel_rss_before_kb: Some(1_024),
            tunnel_rss_after_kb: Some(1_024),
            error: None,
        }
    }

    #[test]
    fn json_object_keeps_nullable_fields() {
        let mut record = passed("aes-256-gcm", 850.0);
        record.server_rss_after_kb = None;
        record.error = Some("connect to tunnel failed: refused".to_string());

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["cipher"], "aes-256-gcm");
        assert!(value["server_rss_after_kb"].is_null());
        assert_eq!(value["tunnel_rss_before_kb"], 1_024);
        assert_eq!(
            value["error"],
            "connect to tunnel failed: refused"
        );
    }

    #[test]
    fn json_round_trips() {
        let record = passed("chacha20-ietf-poly1305", 412.25);
        let json = serde_json::to_string(&record).expect("serialize");
        let back: TrialRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.cipher, record.cipher);
        assert_eq!(back.bytes_transferred, record.bytes_transferred);
        assert!(back.error.is_none());
    }
}
