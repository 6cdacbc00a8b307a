//! A forwarding fake tunnel must move the whole payload and produce a
//! measurable bandwidth.
//!
//! Lives in its own test binary so no other trial holds the fixed ports.

use std::net::TcpListener;
use tunnelbench_core::config::{SINK_PORT, TUNNEL_LOCAL_PORT};
use tunnelbench_core::{platform_sampler, Orchestrator, RunConfiguration};
use tunnelbench_e2e_tests::stage_bin_dir;

const PAYLOAD: u64 = 4 * 1024 * 1024;

#[test]
fn trial_measures_a_forwarded_payload() {
    let dir = tempfile::tempdir().expect("tempdir");
    stage_bin_dir(dir.path());

    let mut config = RunConfiguration::new(dir.path());
    config.payload_bytes = PAYLOAD;
    config.ciphers = vec!["chacha20-ietf-poly1305".to_string()];

    let orchestrator = Orchestrator::new(config, platform_sampler());
    let result = orchestrator.run_trial("chacha20-ietf-poly1305");

    if let Some(error) = &result.error {
        panic!("trial failed: {error}");
    }
    assert_eq!(result.bytes_transferred, PAYLOAD);
    assert!(result.duration > std::time::Duration::ZERO);
    assert!(result.bandwidth_mbps > 0.0);

    // Both roles were alive while sampling ran.
    #[cfg(target_os = "linux")]
    {
        assert!(result.server_rss_before_kb.is_some());
        assert!(result.server_rss_after_kb.is_some());
        assert!(result.tunnel_rss_before_kb.is_some());
        assert!(result.tunnel_rss_after_kb.is_some());
    }

    // Teardown: both processes are gone and both ports are free again.
    TcpListener::bind(("127.0.0.1", SINK_PORT)).expect("sink port must be free");
    TcpListener::bind(("127.0.0.1", TUNNEL_LOCAL_PORT)).expect("tunnel port must be free");
}
