use std::env;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// What the bus does when a listener returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failing listener and surface its error.
    #[default]
    Abort,
    /// Run every listener, then report all failures together.
    Continue,
}

impl FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(anyhow!("unknown failure policy '{other}' (expected 'abort' or 'continue')")),
        }
    }
}

/// Bus behaviour knobs. The defaults reproduce plain fail-fast dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    pub failure_policy: FailurePolicy,
    /// Include payloads in trace-level dispatch logs.
    pub log_payloads: bool,
}

impl BusConfig {
    /// Load from `EVENTFLOW_FAILURE_POLICY` and `EVENTFLOW_LOG_PAYLOADS`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(policy) = optional_env("EVENTFLOW_FAILURE_POLICY") {
            config.failure_policy = policy
                .parse()
                .context("EVENTFLOW_FAILURE_POLICY is invalid")?;
        }
        if let Some(flag) = optional_env("EVENTFLOW_LOG_PAYLOADS") {
            config.log_payloads = parse_flag(&flag).context("EVENTFLOW_LOG_PAYLOADS is invalid")?;
        }
        Ok(config)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_log_payloads(mut self, log_payloads: bool) -> Self {
        self.log_payloads = log_payloads;
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    bus: BusConfig,
}

/// Load the `[bus]` table of a TOML config file.
pub fn load_config(path: &Path) -> Result<BusConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn parse_config(content: &str) -> Result<BusConfig> {
    let file: FileConfig = toml::from_str(content)?;
    Ok(file.bus)
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{other}'")),
    }
}
