//! Point-in-time memory-footprint lookup for supervised processes.
//!
//! Sampling is best-effort telemetry: an unreadable status file, a process
//! that already exited, or a missing `ps` all degrade to `None` and the
//! trial continues with a null memory field. Nothing here panics or errors.

use std::process::Command;
use tracing::debug;

/// Resident-set-size lookup capability. Selected once at startup and
/// injected into the orchestrator; tests substitute deterministic doubles.
pub trait MemorySampler: Send + Sync {
    /// Resident set size in KB, or `None` when unavailable.
    fn rss_kb(&self, pid: u32) -> Option<u64>;
}

/// Parses `VmRSS:` out of `/proc/<pid>/status`.
pub struct ProcStatusSampler;

impl MemorySampler for ProcStatusSampler {
    fn rss_kb(&self, pid: u32) -> Option<u64> {
        let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
        status
            .lines()
            .find(|line| line.starts_with("VmRSS:"))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|kb| kb.parse().ok())
    }
}

/// Shells out to `ps -o rss= -p <pid>` where procfs is unavailable.
pub struct PsSampler;

impl MemorySampler for PsSampler {
    fn rss_kb(&self, pid: u32) -> Option<u64> {
        let output = Command::new("ps")
            .args(["-o", "rss=", "-p"])
            .arg(pid.to_string())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8(output.stdout).ok()?.trim().parse().ok()
    }
}

/// Select the sampling strategy for the detected OS, once at startup.
pub fn platform_sampler() -> Box<dyn MemorySampler> {
    if cfg!(target_os = "linux") {
        debug!("sampling RSS via /proc/<pid>/status");
        Box::new(ProcStatusSampler)
    } else {
        debug!("sampling RSS via ps");
        Box::new(PsSampler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn procfs_sampler_reads_own_process() {
        let rss = ProcStatusSampler.rss_kb(std::process::id());
        assert!(rss.expect("own VmRSS must be readable") > 0);
    }

    #[test]
    fn unknown_pid_degrades_to_none() {
        // PID near the u32 ceiling cannot exist on any sane system.
        assert_eq!(ProcStatusSampler.rss_kb(u32::MAX - 1), None);
        assert_eq!(PsSampler.rss_kb(u32::MAX - 1), None);
    }

    #[test]
    fn ps_sampler_never_panics() {
        // `ps` may be absent in minimal containers; either way this must
        // return quietly.
        if let Some(rss) = PsSampler.rss_kb(std::process::id()) {
            assert!(rss > 0);
        }
    }

    #[test]
    fn platform_sampler_reports_own_process_on_linux() {
        let sampler = platform_sampler();
        if cfg!(target_os = "linux") {
            assert!(sampler.rss_kb(std::process::id()).is_some());
        }
    }
}
