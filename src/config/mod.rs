//! Configuration for slotbook.
//!
//! Located by `--config PATH`, else `~/.config/slotbook/slotbook.yml`, else
//! `./slotbook.yml`. `${VAR}` placeholders are filled from the environment
//! before the YAML is parsed.

mod jobs;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use self::jobs::{AttemptConfig, JobConfig};

use crate::client::BetterConfig;
use crate::domain::BookingJob;
use crate::error::{Result, SlotbookError};
use crate::retry::RetryConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub retry: RetryConfig,
    pub api: BetterConfig,
    /// Wall-clock budget per job run; unset means no limit
    pub job_timeout_secs: Option<u64>,
    pub bookings: Vec<JobConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            retry: RetryConfig::default(),
            api: BetterConfig::default(),
            job_timeout_secs: Some(600),
            bookings: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain; defaults when no file is found
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        match Self::locate(config_path) {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// The config file `load` would read, if any
    pub fn locate(config_path: Option<&PathBuf>) -> Option<PathBuf> {
        if let Some(path) = config_path {
            return Some(path.clone());
        }

        let project_name = env!("CARGO_PKG_NAME");
        let file_name = format!("{}.yml", project_name);

        // ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(&file_name);
            if primary_config.exists() {
                return Some(primary_config);
            }
        }

        let fallback_config = PathBuf::from(&file_name);
        fallback_config.exists().then_some(fallback_config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| SlotbookError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::from_yaml(&content).map_err(|e| SlotbookError::Config(format!("Failed to load {}: {}", path.display(), e)))
    }

    /// Parse, then substitute `${VAR}` placeholders inside string values
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut value: serde_yaml::Value = serde_yaml::from_str(content)?;
        expand_strings(&mut value)?;
        Ok(serde_yaml::from_value(value)?)
    }

    /// Validate every booking section into a BookingJob
    pub fn jobs(&self) -> Result<Vec<BookingJob>> {
        let mut names = HashSet::new();
        let mut jobs = Vec::with_capacity(self.bookings.len());
        for section in &self.bookings {
            let job = section.to_job()?;
            if !names.insert(job.name().to_string()) {
                return Err(SlotbookError::Config(format!("duplicate job name '{}'", job.name())));
            }
            jobs.push(job);
        }
        Ok(jobs)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }
}

fn expand_strings(value: &mut serde_yaml::Value) -> Result<()> {
    use serde_yaml::Value;

    match value {
        Value::String(s) => *s = expand_placeholders(s)?,
        Value::Sequence(items) => items.iter_mut().try_for_each(expand_strings)?,
        Value::Mapping(map) => map.values_mut().try_for_each(expand_strings)?,
        Value::Tagged(tagged) => expand_strings(&mut tagged.value)?,
        _ => {}
    }
    Ok(())
}

/// Expand each `${VAR}` (or `${VAR:-default}`) in `raw`; a bare `$` is literal
fn expand_placeholders(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let placeholder = &rest[start..=start + len];
        let expanded = shellexpand::env(placeholder)
            .map_err(|e| SlotbookError::Config(format!("environment variable '{}' is not set", e.var_name)))?;
        out.push_str(&rest[..start]);
        out.push_str(&expanded);
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
