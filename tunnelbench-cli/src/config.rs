//! Configuration loading from tunnelbench.toml
//!
//! The config file is optional and discovered by walking up from the
//! current directory. Explicit CLI flags always override file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of a `tunnelbench.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    /// Sweep defaults.
    #[serde(default)]
    pub run: RunSection,
    /// Output defaults.
    #[serde(default)]
    pub output: OutputSection,
}

/// `[run]` section: sweep defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    /// Data size to transfer per trial in MB.
    #[serde(default = "default_size_mb")]
    pub size_mb: u64,
    /// Trials per cipher.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// RSS growth threshold in KB to flag as a potential leak.
    #[serde(default = "default_leak_threshold_kb")]
    pub leak_threshold_kb: u64,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            size_mb: default_size_mb(),
            repeat: default_repeat(),
            leak_threshold_kb: default_leak_threshold_kb(),
        }
    }
}

fn default_size_mb() -> u64 {
    100
}
fn default_repeat() -> u32 {
    1
}
fn default_leak_threshold_kb() -> u64 {
    10240
}

/// `[output]` section: where results go.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSection {
    /// Write machine-readable results here after every sweep.
    #[serde(default)]
    pub json_path: Option<PathBuf>,
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Discover and load `tunnelbench.toml` by walking up from the current
    /// directory.
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join("tunnelbench.toml");
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_flag_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.run.size_mb, 100);
        assert_eq!(config.run.repeat, 1);
        assert_eq!(config.run.leak_threshold_kb, 10240);
        assert!(config.output.json_path.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let toml_str = r#"
            [run]
            size_mb = 25
            repeat = 4
        "#;
        let config: HarnessConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.run.size_mb, 25);
        assert_eq!(config.run.repeat, 4);
        assert_eq!(config.run.leak_threshold_kb, 10240);
    }

    #[test]
    fn output_section_parses_a_json_path() {
        let toml_str = r#"
            [output]
            json_path = "results.json"
        "#;
        let config: HarnessConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(
            config.output.json_path,
            Some(PathBuf::from("results.json"))
        );
    }
}
