#![warn(missing_docs)]
//! Tunnelbench CLI
//!
//! Drives cipher x repeat sweeps through the orchestrator, prints progress
//! and the summary table as trials land, writes the optional JSON report,
//! and maps trial errors and leak warnings onto the exit code.

mod config;

pub use config::{HarnessConfig, OutputSection, RunSection};

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tunnelbench_core::config::{aead_ciphers, all_ciphers};
use tunnelbench_core::{platform_sampler, Orchestrator, RunConfiguration};
use tunnelbench_report::{
    format_banner, format_leak_warning, format_summary, format_trial_line, generate_json_report,
    TrialRecord,
};

/// Tunnelbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "tunnelbench")]
#[command(author, version, about = "Stress test ss-server + ss-tunnel bandwidth on loopback")]
pub struct Cli {
    /// Directory containing the ss-server and ss-tunnel binaries
    #[arg(long)]
    pub bin: PathBuf,

    /// Data size to transfer per cipher in MB
    #[arg(long, default_value = "100")]
    pub size: u64,

    /// Test only this specific cipher
    #[arg(long)]
    pub cipher: Option<String>,

    /// Number of times to repeat each cipher test
    #[arg(long, default_value = "1")]
    pub repeat: u32,

    /// Include stream ciphers (deprecated, insecure)
    #[arg(long)]
    pub stream: bool,

    /// RSS growth threshold in KB to flag as potential leak
    #[arg(long, default_value = "10240")]
    pub leak_threshold: u64,

    /// Write results as JSON to this file
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse arguments and run the sweep. This is the binary's entry point.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the sweep with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("tunnelbench=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("tunnelbench=warn")
            .init();
    }

    // Discover tunnelbench.toml; explicit CLI flags override it.
    let file_config = HarnessConfig::discover().unwrap_or_default();
    let config = build_run_configuration(&cli, &file_config)?;
    tracing::debug!(?config, "resolved sweep configuration");

    let bin_display = config
        .bin_dir
        .canonicalize()
        .unwrap_or_else(|_| config.bin_dir.clone());
    print!(
        "{}",
        format_banner(
            &bin_display.display().to_string(),
            config.payload_bytes / (1024 * 1024),
            &config.ciphers,
            config.repeat
        )
    );
    println!();

    let orchestrator = Orchestrator::new(config, platform_sampler());
    let (records, leak_lines) = run_sweep_with_progress(&orchestrator);

    print!("{}", format_summary(&records));

    if let Some(path) = &orchestrator.config().json_path {
        let json = generate_json_report(&records).context("serializing results")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing results to {}", path.display()))?;
        println!("Results written to {}", path.display());
    }

    if !leak_lines.is_empty() {
        println!("\nMEMORY LEAK WARNINGS:");
        for line in &leak_lines {
            println!("{line}");
        }
        println!();
    }

    let failed = records.iter().any(|record| record.error.is_some());
    if failed || !leak_lines.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

/// Drive the sweep under a progress bar, printing each trial's outcome and
/// any leak warnings as they land.
fn run_sweep_with_progress(orchestrator: &Orchestrator) -> (Vec<TrialRecord>, Vec<String>) {
    let config = orchestrator.config();
    let total = config.ciphers.len() * config.repeat as usize;

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut records = Vec::with_capacity(total);
    let mut leak_lines = Vec::new();

    for cipher in &config.ciphers {
        for run in 0..config.repeat {
            let label = if config.repeat > 1 {
                format!("{cipher} (run {}/{})", run + 1, config.repeat)
            } else {
                cipher.clone()
            };
            pb.set_message(label.clone());

            let result = orchestrator.run_trial(cipher);
            let record = TrialRecord::from(&result);
            pb.println(format!("{label:<35} ... {}", format_trial_line(&record)));

            for warning in result.leaks(config.leak_threshold_kb) {
                let line = format_leak_warning(&warning, cipher);
                pb.println(&line);
                leak_lines.push(line);
            }

            records.push(record);
            pb.inc(1);
        }
    }

    pb.finish_and_clear();
    (records, leak_lines)
}

/// Layer the file config under the CLI flags and validate the setup.
///
/// A flag left at its clap default yields to the file value, mirroring how
/// the file itself yields to an explicitly passed flag.
fn build_run_configuration(cli: &Cli, file: &HarnessConfig) -> anyhow::Result<RunConfiguration> {
    if !cli.bin.is_dir() {
        anyhow::bail!("binaries directory not found: {}", cli.bin.display());
    }

    let size_mb = if cli.size != 100 {
        cli.size
    } else {
        file.run.size_mb
    };
    let repeat = if cli.repeat != 1 {
        cli.repeat
    } else {
        file.run.repeat
    };
    let leak_threshold_kb = if cli.leak_threshold != 10240 {
        cli.leak_threshold
    } else {
        file.run.leak_threshold_kb
    };

    Ok(RunConfiguration {
        bin_dir: cli.bin.clone(),
        payload_bytes: size_mb * 1024 * 1024,
        ciphers: resolve_ciphers(cli.cipher.as_deref(), cli.stream),
        repeat,
        leak_threshold_kb,
        json_path: cli.json.clone().or_else(|| file.output.json_path.clone()),
    })
}

/// Cipher selection: one explicit cipher beats everything; `--stream` opts
/// into the legacy set on top of AEAD.
fn resolve_ciphers(cipher: Option<&str>, stream: bool) -> Vec<String> {
    match cipher {
        Some(cipher) => vec![cipher.to_string()],
        None if stream => all_ciphers(),
        None => aead_ciphers(),
    }
}
