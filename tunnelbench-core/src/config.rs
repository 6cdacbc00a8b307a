//! Sweep configuration and the fixed harness endpoints.

use std::path::PathBuf;

/// AEAD ciphers exercised by default.
pub const AEAD_CIPHERS: &[&str] = &["aes-128-gcm", "aes-256-gcm", "chacha20-ietf-poly1305"];

/// Legacy stream ciphers, opted into explicitly.
pub const STREAM_CIPHERS: &[&str] = &[
    "aes-128-cfb",
    "aes-256-cfb",
    "aes-256-ctr",
    "chacha20-ietf",
];

/// Control port the server role binds on loopback.
pub const SERVER_PORT: u16 = 18388;

/// Local port the tunnel role listens on; the load generator connects here.
pub const TUNNEL_LOCAL_PORT: u16 = 18389;

/// Port the sink listens on; the tunnel forwards traffic here.
pub const SINK_PORT: u16 = 18390;

/// Shared secret handed to both roles.
pub const SHARED_SECRET: &str = "stress_test_pw";

/// Parameters for one sweep. Immutable once the orchestrator takes ownership.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Directory containing the `ss-server` and `ss-tunnel` executables.
    pub bin_dir: PathBuf,
    /// Bytes streamed through the tunnel per trial.
    pub payload_bytes: u64,
    /// Cipher identifiers, tested in order.
    pub ciphers: Vec<String>,
    /// Trials per cipher.
    pub repeat: u32,
    /// RSS growth past this many KB flags a potential leak.
    pub leak_threshold_kb: u64,
    /// Machine-readable results are written here when set.
    pub json_path: Option<PathBuf>,
}

impl RunConfiguration {
    /// Default sweep for a binaries directory: 100 MB per trial over the
    /// AEAD ciphers, one repeat, 10 MB leak threshold.
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            payload_bytes: 100 * 1024 * 1024,
            ciphers: aead_ciphers(),
            repeat: 1,
            leak_threshold_kb: 10240,
            json_path: None,
        }
    }
}

/// The default cipher set, owned.
pub fn aead_ciphers() -> Vec<String> {
    AEAD_CIPHERS.iter().map(|c| c.to_string()).collect()
}

/// AEAD plus legacy stream ciphers, owned.
pub fn all_ciphers() -> Vec<String> {
    AEAD_CIPHERS
        .iter()
        .chain(STREAM_CIPHERS)
        .map(|c| c.to_string())
        .collect()
}
