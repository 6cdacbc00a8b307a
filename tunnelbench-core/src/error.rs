//! Trial-scoped error taxonomy.
//!
//! Every variant here is recorded on the trial that hit it; none of them
//! aborts the sweep. Setup problems outside the per-trial loop (a missing
//! binaries directory) are handled at the CLI boundary instead.

use crate::process::Role;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to construct the drain sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink port could not be bound (typically already in use).
    #[error("failed to bind sink on port {port}: {source}")]
    Bind {
        /// Requested listen port.
        port: u16,
        /// Underlying bind error.
        #[source]
        source: io::Error,
    },
}

/// Everything that can end a trial early.
#[derive(Debug, Error)]
pub enum TrialError {
    /// A role's executable is missing from the binaries directory. Kept
    /// distinct from [`TrialError::SpawnFailed`]: this is a setup problem,
    /// not a fault in the process under test.
    #[error("binary not found: {}", .path.display())]
    BinaryNotFound {
        /// Path that was probed.
        path: PathBuf,
    },

    /// The executable exists but could not be started.
    #[error("failed to spawn {role}: {source}")]
    SpawnFailed {
        /// Role whose spawn failed.
        role: Role,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },

    /// A role died during the settle window, before traffic started.
    #[error("{role} exited prematurely (code {})", exit_code_label(.code))]
    PrematureExit {
        /// Role that died.
        role: Role,
        /// Exit code, when the process exited rather than being signalled.
        code: Option<i32>,
    },

    /// The tunnel's local port could not be reached.
    #[error("connect to tunnel failed: {source}")]
    ConnectFailure {
        /// Underlying connect error.
        #[source]
        source: io::Error,
    },

    /// The transfer faulted mid-stream; `bytes_sent` were delivered first.
    #[error("send error at {bytes_sent} bytes: {source}")]
    StreamError {
        /// Bytes handed to the socket before the fault.
        bytes_sent: u64,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The trial's sink could not be constructed.
    #[error("sink unavailable: {source}")]
    SinkUnavailable {
        /// Underlying sink error.
        #[from]
        source: SinkError,
    },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
