// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Processing queue configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::stego::error::StegoError;

/// Upper bound on worker threads.
pub const MAX_WORKERS: usize = 256;
/// Upper bound on the job TTL (ten years).
pub const MAX_JOB_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

/// Queue settings, loadable from TOML:
///
/// ```toml
/// workers = 4
/// job_ttl_secs = 3600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Worker threads; also the concurrency limit.
    pub workers: usize,
    /// Seconds a finished job is kept before `purge_expired` drops it.
    pub job_ttl_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism().map_or(2, |n| n.get()).min(8);
        Self { workers, job_ttl_secs: 3600 }
    }
}

impl QueueConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_job_ttl_secs(mut self, secs: u64) -> Self {
        self.job_ttl_secs = secs;
        self
    }

    pub fn validate(&self) -> Result<(), StegoError> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(StegoError::InvalidConfig(format!(
                "workers must be in 1..={MAX_WORKERS}, got {}",
                self.workers
            )));
        }
        if self.job_ttl_secs > MAX_JOB_TTL_SECS {
            return Err(StegoError::InvalidConfig(format!(
                "job_ttl_secs must be at most {MAX_JOB_TTL_SECS}"
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, StegoError> {
        let config: QueueConfig =
            toml::from_str(s).map_err(|e| StegoError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StegoError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            StegoError::InvalidConfig(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(QueueConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = QueueConfig::from_toml_str("workers = 3").unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.job_ttl_secs, 3600);
    }

    #[test]
    fn zero_workers_invalid() {
        assert!(matches!(
            QueueConfig::from_toml_str("workers = 0"),
            Err(StegoError::InvalidConfig(_))
        ));
    }

    #[test]
    fn malformed_toml_invalid() {
        assert!(QueueConfig::from_toml_str("workers = \"many\"").is_err());
    }

    #[test]
    fn missing_file_invalid() {
        assert!(QueueConfig::from_file("/nonexistent/stegforge.toml").is_err());
    }
}
