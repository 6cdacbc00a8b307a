#![warn(missing_docs)]
//! Tunnelbench Core - Measurement Harness
//!
//! This crate provides the machinery for stress-testing a two-process secure
//! tunnel (`ss-server` + `ss-tunnel`) on loopback:
//! - `DrainSink`: passive endpoint that discards and counts forwarded traffic
//! - Process supervision: spawn, liveness checks, bounded graceful stop
//! - `MemorySampler`: point-in-time RSS lookup with platform variants
//! - Load generation: chunked payload streaming with bandwidth timing
//! - `Orchestrator`: sequences (cipher x repeat) trials and applies the
//!   leak heuristic
//!
//! ## Pipeline Overview
//!
//! ```text
//! RunConfiguration
//!       │
//!       ▼
//! ┌──────────────┐
//! │ Orchestrator │  per trial: sink → spawn roles → settle → sample RSS
//! └──────┬───────┘             → stream payload → sample RSS → teardown
//!        │
//!        ▼
//!   Vec<TrialResult> (bandwidth, RSS before/after, error)
//! ```

pub mod config;
pub mod error;
pub mod loadgen;
pub mod orchestrator;
pub mod process;
pub mod sampler;
pub mod sink;

pub use config::RunConfiguration;
pub use error::{SinkError, TrialError};
pub use loadgen::{stream_to, Transfer, CHUNK_SIZE};
pub use orchestrator::{bandwidth_mbps, LeakWarning, Orchestrator, TrialResult};
pub use process::{spawn, ChildProcess, Role};
pub use sampler::{platform_sampler, MemorySampler, ProcStatusSampler, PsSampler};
pub use sink::DrainSink;
