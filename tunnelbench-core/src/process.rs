//! External process supervision: spawn, liveness, bounded stop.
//!
//! Both tunnel roles are opaque executables; the harness only controls their
//! argv, discards their stdio, and guarantees they are gone when a trial
//! ends. Termination escalates SIGTERM → SIGKILL with a bounded wait after
//! each signal, so `stop` can never hang a sweep.

use crate::config::{SERVER_PORT, SHARED_SECRET, SINK_PORT, TUNNEL_LOCAL_PORT};
use crate::error::TrialError;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Grace allowed after SIGTERM before escalating.
const TERM_GRACE: Duration = Duration::from_secs(5);

/// Grace allowed after SIGKILL before abandoning the wait.
const KILL_GRACE: Duration = Duration::from_secs(3);

/// Poll interval while waiting for an exit.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// The two supervised tunnel roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Encrypting relay that terminates the secure channel.
    Server,
    /// Local forwarder that relays traffic toward the server role.
    Tunnel,
}

impl Role {
    /// Executable name looked up inside the binaries directory.
    pub fn binary_name(self) -> &'static str {
        match self {
            Role::Server => "ss-server",
            Role::Tunnel => "ss-tunnel",
        }
    }

    /// argv for this role. Ports, forward target, and secret are the fixed
    /// harness endpoints; only the cipher varies per trial.
    pub fn args(self, cipher: &str) -> Vec<String> {
        let mut args = vec![
            "-s".to_string(),
            "127.0.0.1".to_string(),
            "-p".to_string(),
            SERVER_PORT.to_string(),
            "-k".to_string(),
            SHARED_SECRET.to_string(),
            "-m".to_string(),
            cipher.to_string(),
        ];
        if self == Role::Tunnel {
            args.push("-l".to_string());
            args.push(TUNNEL_LOCAL_PORT.to_string());
            args.push("-L".to_string());
            args.push(format!("127.0.0.1:{SINK_PORT}"));
        }
        args
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Spawn a role's executable from `bin_dir` with all stdio discarded.
///
/// A missing executable is reported as [`TrialError::BinaryNotFound`] so
/// callers can tell a setup problem apart from a fault in the process under
/// test.
pub fn spawn(bin_dir: &Path, role: Role, cipher: &str) -> Result<ChildProcess, TrialError> {
    let path = bin_dir.join(role.binary_name());
    if !path.is_file() {
        return Err(TrialError::BinaryNotFound { path });
    }

    let child = match Command::new(&path)
        .args(role.args(cipher))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            return Err(TrialError::BinaryNotFound { path });
        }
        Err(source) => return Err(TrialError::SpawnFailed { role, source }),
    };

    debug!(role = %role, pid = child.id(), "spawned");
    Ok(ChildProcess { child, role })
}

/// A supervised external process. Lifecycle: Spawned → Running → Stopping →
/// Exited; `Drop` backstops `stop` so no exit path leaks a process.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    role: Role,
}

impl ChildProcess {
    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Role this process was spawned as.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Non-blocking, best-effort liveness check. Never errors; an
    /// unreadable process table reads as "not alive".
    pub fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(_)) => false,
            Ok(None) => true,
            Err(_) => false,
        }
    }

    /// Exit code, once the process has exited normally. `None` while it is
    /// still running or when it was killed by a signal.
    pub fn exit_code(&mut self) -> Option<i32> {
        match self.child.try_wait() {
            Ok(Some(status)) => status.code(),
            _ => None,
        }
    }

    /// Request termination and wait for it within the two bounded graces.
    ///
    /// Idempotent: stopping an already-exited process is a no-op. Always
    /// returns within roughly `TERM_GRACE + KILL_GRACE`.
    pub fn stop(&mut self) {
        if !self.is_alive() {
            return;
        }

        debug!(role = %self.role, pid = self.pid(), "sending SIGTERM");
        let _ = send_sigterm(self.child.id());
        if self.wait_within(TERM_GRACE) {
            return;
        }

        warn!(role = %self.role, pid = self.pid(), "no exit after SIGTERM, killing");
        let _ = self.child.kill();
        if !self.wait_within(KILL_GRACE) {
            warn!(role = %self.role, pid = self.pid(), "still running after SIGKILL");
        }
    }

    /// Poll `try_wait` until the process exits or `grace` elapses.
    fn wait_within(&mut self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return true,
                Ok(None) => {}
                // The wait channel is broken; nothing more we can observe.
                Err(_) => return true,
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(WAIT_POLL);
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Send SIGTERM to a process. Returns `Err` if the signal could not be
/// delivered.
fn send_sigterm(pid: u32) -> Result<(), io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
