#![warn(missing_docs)]
//! Tunnelbench Report - Records and Output Formats
//!
//! Turns trial results into:
//! - JSON (machine-readable array, one object per trial)
//! - Human-readable progress lines, leak warnings, and the summary table

mod human;
mod json;
mod record;

pub use human::{
    format_banner, format_leak_warning, format_rss, format_rss_kb, format_size, format_summary,
    format_trial_line,
};
pub use json::generate_json_report;
pub use record::TrialRecord;
