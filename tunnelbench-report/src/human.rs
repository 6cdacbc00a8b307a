//! Human-readable output.
//!
//! String-building formatters for the sweep banner, per-trial progress
//! lines, leak warnings, and the final summary table.

use crate::record::TrialRecord;
use tunnelbench_core::LeakWarning;

const RULE_WIDTH: usize = 72;

/// Render a byte count with a binary-unit suffix.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Render an RSS reading in KB, scaling to MB when large.
pub fn format_rss_kb(kb: u64) -> String {
    if kb >= 1024 {
        format!("{:.1} MB", kb as f64 / 1024.0)
    } else {
        format!("{kb} KB")
    }
}

/// Render an optional RSS reading; an unavailable sample shows as `N/A`.
pub fn format_rss(kb: Option<u64>) -> String {
    match kb {
        Some(kb) => format_rss_kb(kb),
        None => "N/A".to_string(),
    }
}

/// The banner printed before the sweep starts.
pub fn format_banner(bin_dir: &str, size_mb: u64, ciphers: &[String], repeat: u32) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "{rule}\n\
         tunnelbench stress test\n\
         {rule}\n\
         \x20 Binaries : {bin_dir}\n\
         \x20 Data size: {size_mb} MB per cipher\n\
         \x20 Ciphers  : {}\n\
         \x20 Repeats  : {repeat}\n\
         {rule}\n",
        ciphers.join(", ")
    )
}

/// One-line outcome for a finished trial.
pub fn format_trial_line(record: &TrialRecord) -> String {
    match &record.error {
        Some(error) => format!("FAILED: {error}"),
        None => format!(
            "{:8.1} Mbps  ({:5.2}s, {})",
            record.bandwidth_mbps,
            record.duration_sec,
            format_size(record.bytes_transferred)
        ),
    }
}

/// A leak warning line, printed distinctly as the sweep progresses.
pub fn format_leak_warning(warning: &LeakWarning, cipher: &str) -> String {
    format!(
        "  WARNING: {} RSS grew by {} ({} -> {}) during {} test",
        warning.role,
        format_rss_kb(warning.growth_kb.max(0) as u64),
        format_rss_kb(warning.before_kb),
        format_rss_kb(warning.after_kb),
        cipher
    )
}

/// The final aligned summary table plus the pass/fail tally.
pub fn format_summary(records: &[TrialRecord]) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push('\n');
    out.push_str(&rule);
    out.push_str("\nRESULTS SUMMARY\n");
    out.push_str(&rule);
    out.push_str("\n\n");
    out.push_str(&format!(
        "{:<30} {:>10} {:>8} {:>12} {:>12}\n",
        "Cipher", "Bandwidth", "Time", "Server RSS", "Tunnel RSS"
    ));
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');

    for record in records {
        if record.error.is_some() {
            out.push_str(&format!("{:<30} {:>10}\n", record.cipher, "FAILED"));
            continue;
        }

        let server_rss = rss_transition(record.server_rss_before_kb, record.server_rss_after_kb);
        let tunnel_rss = rss_transition(record.tunnel_rss_before_kb, record.tunnel_rss_after_kb);
        out.push_str(&format!(
            "{:<30} {:>6.1} Mbps {:>7.2}s {:>12} {:>12}\n",
            record.cipher, record.bandwidth_mbps, record.duration_sec, server_rss, tunnel_rss
        ));
    }

    let failed = records.iter().filter(|r| r.error.is_some()).count();
    let passed = records.len() - failed;
    out.push_str(&format!("\n{passed} passed, {failed} failed\n"));

    out
}

fn rss_transition(before: Option<u64>, after: Option<u64>) -> String {
    match (before, after) {
        (Some(before), Some(after)) => {
            format!("{}->{}", format_rss_kb(before), format_rss_kb(after))
        }
        _ => "N/A".to_string(),
    }
}
