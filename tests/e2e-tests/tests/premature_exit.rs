//! Both roles exiting immediately must yield one failed trial, not a crash.
//!
//! Lives in its own test binary: `TESTEXE_EXIT_CODE` is process-global and
//! the fixed sink port tolerates no concurrent trials.

use std::net::TcpListener;
use tunnelbench_core::config::SINK_PORT;
use tunnelbench_core::{platform_sampler, Orchestrator, RunConfiguration};
use tunnelbench_e2e_tests::stage_bin_dir;
use tunnelbench_report::TrialRecord;

#[test]
fn sweep_records_premature_exit_and_keeps_going() {
    // Inherited by both spawned roles.
    std::env::set_var("TESTEXE_EXIT_CODE", "1");
    let dir = tempfile::tempdir().expect("tempdir");
    stage_bin_dir(dir.path());

    let mut config = RunConfiguration::new(dir.path());
    config.payload_bytes = 1024 * 1024;
    config.ciphers = vec!["aes-256-gcm".to_string()];

    let orchestrator = Orchestrator::new(config, platform_sampler());
    let results = orchestrator.run_sweep(|_| {});

    assert_eq!(results.len(), 1);
    let result = &results[0];
    let error = result.error.as_ref().expect("trial must fail").to_string();
    assert!(
        error.contains("exited prematurely"),
        "unexpected error: {error}"
    );
    assert_eq!(error, "ss-server exited prematurely (code 1)");
    assert_eq!(result.bandwidth_mbps, 0.0);
    assert_eq!(result.bytes_transferred, 0);
    assert!(result.server_rss_before_kb.is_none());

    // The record carries the error through to the JSON surface.
    let record = TrialRecord::from(result);
    assert_eq!(record.error.as_deref(), Some(error.as_str()));
    assert_eq!(record.bandwidth_mbps, 0.0);

    // Teardown freed the sink port.
    TcpListener::bind(("127.0.0.1", SINK_PORT)).expect("sink port must be free");
}
