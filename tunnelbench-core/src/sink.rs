//! Passive discard endpoint used as the tunnel's forward target.
//!
//! The sink accepts any number of concurrent connections and reads each to
//! completion, discarding the bytes but counting them. The accept loop and
//! every per-connection drain run on their own threads, all observing one
//! shared stop flag through short poll/read timeouts, so `stop` is prompt
//! and bounded even while traffic is flowing.
//!
//! Byte accounting is aggregated by message passing: each drain owns a local
//! count and reports it exactly once over a channel when it finishes. There
//! is no shared mutable counter.

use crate::error::SinkError;
use std::io::Read;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Interval at which the accept loop re-checks the stop flag.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Per-read timeout so drain loops observe a stop promptly.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// A connection silent for this long is abandoned.
const IDLE_LIMIT: Duration = Duration::from_secs(5);

/// Read buffer size; matches the load generator's chunk size.
const DRAIN_BUF: usize = 64 * 1024;

/// A loopback listener that drains and counts incoming bytes.
///
/// Lifecycle: Created → Listening → (per connection) Draining → Stopped.
/// One sink belongs to exactly one trial and is never reused.
#[derive(Debug)]
pub struct DrainSink {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    accept_handle: Option<JoinHandle<()>>,
    counts: Receiver<u64>,
    drained: u64,
}

impl DrainSink {
    /// Bind the loopback listener on `port` and start accepting.
    ///
    /// A bind failure (port already in use) is a construction error and is
    /// never retried. Pass port 0 to bind an ephemeral port, then read it
    /// back through [`DrainSink::local_addr`].
    pub fn bind(port: u16) -> Result<Self, SinkError> {
        let listener =
            TcpListener::bind(("127.0.0.1", port)).map_err(|source| SinkError::Bind { port, source })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| SinkError::Bind { port, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| SinkError::Bind { port, source })?;

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, counts) = mpsc::channel();
        let accept_stop = Arc::clone(&stop);
        let accept_handle = thread::spawn(move || accept_loop(listener, accept_stop, tx));

        debug!(%local_addr, "sink listening");
        Ok(Self {
            local_addr,
            stop,
            accept_handle: Some(accept_handle),
            counts,
            drained: 0,
        })
    }

    /// Address actually bound (relevant when constructed with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Total bytes drained by connections that have finished.
    /// Monotonically non-decreasing across calls.
    pub fn bytes_drained(&mut self) -> u64 {
        while let Ok(count) = self.counts.try_recv() {
            self.drained += count;
        }
        self.drained
    }

    /// Halt acceptance, wind down every in-flight drain, and wait for all of
    /// it. Idempotent; returns within the accept poll plus the drain read
    /// timeout.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.accept_handle.take() {
            if handle.join().is_err() {
                warn!("sink accept thread panicked");
            }
        }
        // Fold in counts flushed during shutdown.
        self.bytes_drained();
    }
}

impl Drop for DrainSink {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(listener: TcpListener, stop: Arc<AtomicBool>, counts: Sender<u64>) {
    let mut drains: Vec<JoinHandle<()>> = Vec::new();

    while !stop.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((conn, peer)) => {
                trace!(%peer, "sink accepted connection");
                let stop = Arc::clone(&stop);
                let counts = counts.clone();
                drains.push(thread::spawn(move || {
                    let count = drain(conn, &stop);
                    // The receiver may already be gone on teardown.
                    let _ = counts.send(count);
                }));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                warn!(error = %e, "sink accept failed");
                break;
            }
        }
    }

    for handle in drains {
        let _ = handle.join();
    }
}

/// Read one connection to completion and return the bytes discarded.
/// A fault or idleness ends this drain without touching the listener or any
/// other connection.
fn drain(conn: TcpStream, stop: &AtomicBool) -> u64 {
    // Accepted sockets do not inherit the listener's non-blocking mode on
    // every platform; force blocking reads with a timeout.
    if conn.set_nonblocking(false).is_err() || conn.set_read_timeout(Some(READ_TIMEOUT)).is_err() {
        return 0;
    }

    let mut conn = conn;
    let mut buf = vec![0u8; DRAIN_BUF];
    let mut count = 0u64;
    let mut last_data = Instant::now();

    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match conn.read(&mut buf) {
            Ok(0) => break, // peer closed
            Ok(n) => {
                count += n as u64;
                last_data = Instant::now();
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                if last_data.elapsed() >= IDLE_LIMIT {
                    trace!("sink connection idle, abandoning");
                    break;
                }
            }
            Err(_) => break, // connection fault; this drain only
        }
    }

    let _ = conn.shutdown(Shutdown::Both);
    count
}
