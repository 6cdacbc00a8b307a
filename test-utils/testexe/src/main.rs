//! Test executable standing in for ss-server / ss-tunnel in E2E tests.
//!
//! Accepts the real flag surface of both roles so the harness can spawn it
//! with unmodified argv. Behavior is driven by environment variables, which
//! the test process sets and the spawned child inherits:
//!
//! - `TESTEXE_EXIT_CODE=<n>`: exit immediately with code `n`
//! - `TESTEXE_RATE_BPS=<n>`: throttle relayed traffic to roughly `n`
//!   bytes per second
//!
//! With `-l` and `-L` present it plays the tunnel role: accept on the local
//! port and relay every connection to the forward target. Otherwise it
//! plays the server role: bind the control port and idle until signalled.

use clap::Parser;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "testexe")]
#[command(about = "Fake tunnel-role executable for harness testing", long_about = None)]
struct Args {
    /// Server bind address
    #[arg(short = 's')]
    server_addr: String,

    /// Server control port
    #[arg(short = 'p')]
    server_port: u16,

    /// Shared secret
    #[arg(short = 'k')]
    key: String,

    /// Cipher name
    #[arg(short = 'm')]
    method: String,

    /// Local listen port (tunnel role only)
    #[arg(short = 'l')]
    local_port: Option<u16>,

    /// Forward target host:port (tunnel role only)
    #[arg(short = 'L')]
    forward: Option<String>,
}

fn main() {
    let args = Args::parse();

    if let Ok(code) = std::env::var("TESTEXE_EXIT_CODE") {
        std::process::exit(code.parse().unwrap_or(1));
    }

    let rate_bps: Option<u64> = std::env::var("TESTEXE_RATE_BPS")
        .ok()
        .and_then(|value| value.parse().ok());

    // The harness discards stdio; this only shows in manual runs.
    eprintln!(
        "testexe: cipher {} key {} server {}:{}",
        args.method, args.key, args.server_addr, args.server_port
    );

    match (args.local_port, args.forward.as_deref()) {
        (Some(local_port), Some(forward)) => run_forwarder(local_port, forward, rate_bps),
        _ => idle(&args.server_addr, args.server_port),
    }
}

/// Server role: hold the control port open until the harness signals us.
/// SIGTERM's default disposition terminates the process.
fn idle(addr: &str, port: u16) -> ! {
    let _listener = TcpListener::bind((addr, port));
    loop {
        thread::sleep(Duration::from_secs(3600));
    }
}

/// Tunnel role: accept on the local port, relay each connection to the
/// forward target on its own thread.
fn run_forwarder(local_port: u16, forward: &str, rate_bps: Option<u64>) -> ! {
    let listener = match TcpListener::bind(("127.0.0.1", local_port)) {
        Ok(listener) => listener,
        Err(error) => {
            eprintln!("testexe: bind 127.0.0.1:{local_port}: {error}");
            std::process::exit(1);
        }
    };

    for conn in listener.incoming() {
        match conn {
            Ok(inbound) => {
                let target = forward.to_string();
                thread::spawn(move || relay(inbound, &target, rate_bps));
            }
            Err(_) => continue,
        }
    }
    // `incoming` never returns None; unreachable in practice.
    std::process::exit(0);
}

/// Copy inbound bytes to the forward target, propagating the half-close so
/// the sink sees EOF once the sender is done.
fn relay(mut inbound: TcpStream, target: &str, rate_bps: Option<u64>) {
    let mut outbound = match TcpStream::connect(target) {
        Ok(stream) => stream,
        Err(error) => {
            eprintln!("testexe: connect {target}: {error}");
            return;
        }
    };

    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = match inbound.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        if outbound.write_all(&buf[..n]).is_err() {
            break;
        }
        if let Some(rate) = rate_bps {
            thread::sleep(Duration::from_secs_f64(n as f64 / rate as f64));
        }
    }
    let _ = outbound.shutdown(Shutdown::Write);
}
