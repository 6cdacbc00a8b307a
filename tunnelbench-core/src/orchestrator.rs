//! Trial sequencing: wires the sink, both supervised roles, memory
//! sampling, and the load generator into one measurement per
//! (cipher, repeat) pair.
//!
//! Trials run strictly one at a time so that no resource contention skews
//! the bandwidth or memory numbers. Teardown of the processes and the sink
//! executes on every path out of a trial, and one trial's failure never
//! aborts the sweep.

use crate::config::{RunConfiguration, SINK_PORT, TUNNEL_LOCAL_PORT};
use crate::error::TrialError;
use crate::loadgen;
use crate::process::{self, ChildProcess, Role};
use crate::sampler::MemorySampler;
use crate::sink::DrainSink;
use std::net::SocketAddr;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Fixed wait for both roles to bind their sockets after spawn. Readiness
/// stays delay-based: probing the tunnel's local port with an empty
/// connection crashes ss-tunnel during startup.
pub const SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Wait after the transfer for in-flight data to reach the sink.
const FLUSH_SETTLE: Duration = Duration::from_millis(500);

/// Bound on establishing the connection to the tunnel's local port.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one (cipher, repeat) trial.
///
/// When `error` is present the numeric fields are not meaningful and are
/// left at zero; consumers must not interpret them.
#[derive(Debug)]
pub struct TrialResult {
    /// Cipher exercised by this trial.
    pub cipher: String,
    /// Bytes streamed into the tunnel.
    pub bytes_transferred: u64,
    /// Wall-clock duration of the transfer.
    pub duration: Duration,
    /// Sender-side bandwidth in Mbps.
    pub bandwidth_mbps: f64,
    /// Server-role RSS before the transfer, when sampling succeeded.
    pub server_rss_before_kb: Option<u64>,
    /// Server-role RSS after the transfer.
    pub server_rss_after_kb: Option<u64>,
    /// Tunnel-role RSS before the transfer.
    pub tunnel_rss_before_kb: Option<u64>,
    /// Tunnel-role RSS after the transfer.
    pub tunnel_rss_after_kb: Option<u64>,
    /// What ended the trial early, if anything.
    pub error: Option<TrialError>,
}

impl TrialResult {
    fn new(cipher: &str) -> Self {
        Self {
            cipher: cipher.to_string(),
            bytes_transferred: 0,
            duration: Duration::ZERO,
            bandwidth_mbps: 0.0,
            server_rss_before_kb: None,
            server_rss_after_kb: None,
            tunnel_rss_before_kb: None,
            tunnel_rss_after_kb: None,
            error: None,
        }
    }

    fn failed(cipher: &str, error: TrialError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(cipher)
        }
    }

    /// Whether this trial ended in an error.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// RSS growth for one role, when both samples are present. May be
    /// negative.
    pub fn rss_growth_kb(&self, role: Role) -> Option<i64> {
        let (before, after) = self.rss_pair(role);
        match (before, after) {
            (Some(before), Some(after)) => Some(after as i64 - before as i64),
            _ => None,
        }
    }

    /// Leak warnings for this trial, evaluated once and independently per
    /// role. A warning fires when growth exceeds `threshold_kb`.
    pub fn leaks(&self, threshold_kb: u64) -> Vec<LeakWarning> {
        [Role::Server, Role::Tunnel]
            .into_iter()
            .filter_map(|role| {
                let growth_kb = self.rss_growth_kb(role)?;
                if growth_kb <= threshold_kb as i64 {
                    return None;
                }
                let (before, after) = self.rss_pair(role);
                Some(LeakWarning {
                    role,
                    growth_kb,
                    before_kb: before.unwrap_or(0),
                    after_kb: after.unwrap_or(0),
                })
            })
            .collect()
    }

    fn rss_pair(&self, role: Role) -> (Option<u64>, Option<u64>) {
        match role {
            Role::Server => (self.server_rss_before_kb, self.server_rss_after_kb),
            Role::Tunnel => (self.tunnel_rss_before_kb, self.tunnel_rss_after_kb),
        }
    }
}

/// RSS growth past the configured threshold for one role in one trial.
#[derive(Debug, Clone, Copy)]
pub struct LeakWarning {
    /// Role whose footprint grew.
    pub role: Role,
    /// Growth over the trial in KB.
    pub growth_kb: i64,
    /// RSS before the transfer in KB.
    pub before_kb: u64,
    /// RSS after the transfer in KB.
    pub after_kb: u64,
}

/// Sender-side bandwidth in Mbps; an instantaneous transfer reports 0
/// rather than dividing by zero.
pub fn bandwidth_mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 * 8.0) / (secs * 1e6)
    } else {
        0.0
    }
}

/// Sequences trials over an immutable configuration with an injected
/// memory sampler.
pub struct Orchestrator {
    config: RunConfiguration,
    sampler: Box<dyn MemorySampler>,
}

impl Orchestrator {
    /// Build an orchestrator; `sampler` is chosen once at startup (see
    /// [`crate::sampler::platform_sampler`]) or substituted in tests.
    pub fn new(config: RunConfiguration, sampler: Box<dyn MemorySampler>) -> Self {
        Self { config, sampler }
    }

    /// The sweep parameters this orchestrator was built with.
    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Run every (cipher, repeat) pair in order, strictly sequentially.
    /// `on_trial` observes each result as it lands; one trial's failure
    /// never aborts the sweep.
    pub fn run_sweep(&self, mut on_trial: impl FnMut(&TrialResult)) -> Vec<TrialResult> {
        let total = self.config.ciphers.len() * self.config.repeat as usize;
        let mut results = Vec::with_capacity(total);
        for cipher in &self.config.ciphers {
            for _ in 0..self.config.repeat {
                let result = self.run_trial(cipher);
                on_trial(&result);
                results.push(result);
            }
        }
        results
    }

    /// Execute one trial through the full state machine. Teardown of both
    /// processes and the sink runs unconditionally on every exit path.
    pub fn run_trial(&self, cipher: &str) -> TrialResult {
        info!(cipher, payload = self.config.payload_bytes, "starting trial");

        let mut sink = match DrainSink::bind(SINK_PORT) {
            Ok(sink) => sink,
            Err(source) => {
                return TrialResult::failed(cipher, TrialError::SinkUnavailable { source });
            }
        };
        let mut server: Option<ChildProcess> = None;
        let mut tunnel: Option<ChildProcess> = None;

        let outcome = self.trial_body(cipher, &mut server, &mut tunnel);

        // Unconditional teardown; Drop impls backstop a panicking path.
        if let Some(tunnel) = tunnel.as_mut() {
            tunnel.stop();
        }
        if let Some(server) = server.as_mut() {
            server.stop();
        }
        sink.stop();
        debug!(cipher, drained = sink.bytes_drained(), "trial torn down");

        match outcome {
            Ok(result) => result,
            Err(error) => TrialResult::failed(cipher, error),
        }
    }

    /// Steps 1-5 of the trial. The caller owns teardown, so any `?` here
    /// still leaves no process or socket behind.
    fn trial_body(
        &self,
        cipher: &str,
        server: &mut Option<ChildProcess>,
        tunnel: &mut Option<ChildProcess>,
    ) -> Result<TrialResult, TrialError> {
        let bin_dir = &self.config.bin_dir;
        let server = server.insert(process::spawn(bin_dir, Role::Server, cipher)?);
        let tunnel = tunnel.insert(process::spawn(bin_dir, Role::Tunnel, cipher)?);

        thread::sleep(SETTLE_DELAY);

        if !server.is_alive() {
            return Err(TrialError::PrematureExit {
                role: Role::Server,
                code: server.exit_code(),
            });
        }
        if !tunnel.is_alive() {
            return Err(TrialError::PrematureExit {
                role: Role::Tunnel,
                code: tunnel.exit_code(),
            });
        }

        let mut result = TrialResult::new(cipher);
        result.server_rss_before_kb = self.sampler.rss_kb(server.pid());
        result.tunnel_rss_before_kb = self.sampler.rss_kb(tunnel.pid());

        let addr = SocketAddr::from(([127, 0, 0, 1], TUNNEL_LOCAL_PORT));
        let transfer = loadgen::stream_to(addr, self.config.payload_bytes, CONNECT_TIMEOUT);
        match transfer.error {
            Some(error @ TrialError::ConnectFailure { .. }) => return Err(error),
            Some(error) => {
                // Mid-stream fault: keep the partial count for diagnostics;
                // the remaining numeric fields stay zeroed.
                result.bytes_transferred = transfer.bytes_sent;
                result.error = Some(error);
                return Ok(result);
            }
            None => {}
        }

        thread::sleep(FLUSH_SETTLE);

        result.bytes_transferred = transfer.bytes_sent;
        result.duration = transfer.elapsed;
        result.bandwidth_mbps = bandwidth_mbps(transfer.bytes_sent, transfer.elapsed);
        result.server_rss_after_kb = self.sampler.rss_kb(server.pid());
        result.tunnel_rss_after_kb = self.sampler.rss_kb(tunnel.pid());

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bandwidth_guards_zero_elapsed() {
        assert_eq!(bandwidth_mbps(1024, Duration::ZERO), 0.0);
    }

    #[test]
    fn bandwidth_converts_bytes_per_second_to_mbps() {
        // 1 MiB in exactly one second.
        let mbps = bandwidth_mbps(1024 * 1024, Duration::from_secs(1));
        assert!((mbps - 8.388608).abs() < 1e-9);
    }

    fn result_with_rss(before: u64, after: u64) -> TrialResult {
        let mut result = TrialResult::new("aes-256-gcm");
        result.server_rss_before_kb = Some(before);
        result.server_rss_after_kb = Some(after);
        result
    }

    #[test]
    fn growth_over_threshold_fires_a_warning() {
        let result = result_with_rss(1_000, 12_000);
        let warnings = result.leaks(10_240);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].growth_kb, 11_000);
        assert_eq!(warnings[0].role, Role::Server);
    }

    #[test]
    fn growth_under_threshold_stays_quiet() {
        let result = result_with_rss(1_000, 5_000);
        assert!(result.leaks(10_240).is_empty());
    }

    #[test]
    fn roles_are_evaluated_independently() {
        let mut result = result_with_rss(1_000, 20_000);
        result.tunnel_rss_before_kb = Some(1_000);
        result.tunnel_rss_after_kb = Some(1_500);
        let warnings = result.leaks(10_240);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].role, Role::Server);
    }

    #[test]
    fn missing_samples_never_warn() {
        let mut result = TrialResult::new("aes-128-gcm");
        result.server_rss_before_kb = Some(1_000);
        // after is absent: the sampler degraded mid-trial
        assert_eq!(result.rss_growth_kb(Role::Server), None);
        assert!(result.leaks(0).is_empty());
    }

    #[test]
    fn shrinking_footprint_reports_negative_growth() {
        let result = result_with_rss(5_000, 4_000);
        assert_eq!(result.rss_growth_kb(Role::Server), Some(-1_000));
        assert!(result.leaks(0).is_empty());
    }
}
