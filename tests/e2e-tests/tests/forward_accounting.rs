//! The sink must account for every byte the fake tunnel relays, even when
//! the relay runs slower than the sender.
//!
//! Drives the sink and load generator directly against a hand-spawned
//! `testexe` tunnel so the sink can use an ephemeral port.

use std::net::SocketAddr;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tunnelbench_core::config::TUNNEL_LOCAL_PORT;
use tunnelbench_core::{stream_to, DrainSink};
use tunnelbench_e2e_tests::testexe_path;

const PAYLOAD: u64 = 2 * 1024 * 1024;

#[test]
fn relayed_bytes_all_reach_the_sink() {
    // Throttle the relay so the sender outruns it; inherited by the child.
    std::env::set_var("TESTEXE_RATE_BPS", "8388608"); // 8 MiB/s

    let mut sink = DrainSink::bind(0).expect("bind sink");
    let sink_port = sink.local_addr().port();

    let mut tunnel = Command::new(testexe_path())
        .args([
            "-s",
            "127.0.0.1",
            "-p",
            "18388",
            "-k",
            "stress_test_pw",
            "-m",
            "aes-128-gcm",
            "-l",
            &TUNNEL_LOCAL_PORT.to_string(),
            "-L",
            &format!("127.0.0.1:{sink_port}"),
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn testexe tunnel");

    // Give the forwarder a moment to bind its local port.
    thread::sleep(Duration::from_millis(500));

    let addr = SocketAddr::from(([127, 0, 0, 1], TUNNEL_LOCAL_PORT));
    let transfer = stream_to(addr, PAYLOAD, Duration::from_secs(5));
    assert!(transfer.error.is_none(), "transfer: {:?}", transfer.error);
    assert_eq!(transfer.bytes_sent, PAYLOAD);

    // The throttled relay is still flushing; wait for the full count.
    let deadline = Instant::now() + Duration::from_secs(15);
    while sink.bytes_drained() < PAYLOAD && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(sink.bytes_drained(), PAYLOAD);

    let _ = tunnel.kill();
    let _ = tunnel.wait();
    sink.stop();
}
