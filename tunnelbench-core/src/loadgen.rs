//! Load generation against the tunnel's local port.
//!
//! Streams a fixed payload of zeros in 64 KiB chunks and measures the wall
//! clock from the first chunk write to completion of the last. A transfer
//! that faults mid-stream is reported with its partial byte count and never
//! retried; the decision what to do with a failed run belongs to the trial.

use crate::error::TrialError;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};
use tracing::debug;

/// Chunk granularity for the streamed payload.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Cap on how long a single chunk write may stall.
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one payload transfer.
#[derive(Debug)]
pub struct Transfer {
    /// Bytes handed to the socket before completion or fault.
    pub bytes_sent: u64,
    /// Wall clock from the first chunk write to completion of the last.
    pub elapsed: Duration,
    /// Fault that ended the transfer early, if any.
    pub error: Option<TrialError>,
}

impl Transfer {
    fn empty() -> Self {
        Self {
            bytes_sent: 0,
            elapsed: Duration::ZERO,
            error: None,
        }
    }
}

/// Stream `total_bytes` of zeros to `addr` in fixed-size chunks.
///
/// Connecting is bounded by `connect_timeout` and fails fast with
/// [`TrialError::ConnectFailure`]. After the last chunk the write side is
/// half-closed so the receiving role can flush before the socket is fully
/// torn down. `total_bytes == 0` completes immediately with no error.
pub fn stream_to(addr: SocketAddr, total_bytes: u64, connect_timeout: Duration) -> Transfer {
    if total_bytes == 0 {
        return Transfer::empty();
    }

    let mut stream = match TcpStream::connect_timeout(&addr, connect_timeout) {
        Ok(stream) => stream,
        Err(source) => {
            return Transfer {
                error: Some(TrialError::ConnectFailure { source }),
                ..Transfer::empty()
            };
        }
    };
    if let Err(source) = stream.set_write_timeout(Some(WRITE_TIMEOUT)) {
        return Transfer {
            error: Some(TrialError::ConnectFailure { source }),
            ..Transfer::empty()
        };
    }

    let chunk = [0u8; CHUNK_SIZE];
    let mut sent: u64 = 0;
    let mut error = None;

    let start = Instant::now();
    while sent < total_bytes {
        let len = (total_bytes - sent).min(CHUNK_SIZE as u64) as usize;
        match stream.write_all(&chunk[..len]) {
            Ok(()) => sent += len as u64,
            Err(source) => {
                error = Some(TrialError::StreamError {
                    bytes_sent: sent,
                    source,
                });
                break;
            }
        }
    }
    let elapsed = start.elapsed();

    // Half-close the write side; the receiver finishes flushing before the
    // socket is torn down.
    let _ = stream.shutdown(Shutdown::Write);

    debug!(bytes = sent, ?elapsed, faulted = error.is_some(), "transfer finished");
    Transfer {
        bytes_sent: sent,
        elapsed,
        error,
    }
}
