//! Run configuration loaded from an optional `sbx.toml`
//!
//! ```toml
//! workers = 4
//! base_url = "https://mapi.storyblok.com/v1"
//!
//! [limiter]
//! read_rps = 7.0
//! write_rps = 7.0
//! burst = 7
//!
//! [retry]
//! max_attempts = 5
//! initial_backoff_ms = 250
//! ```
//!
//! Every key is optional. Command-line flags and environment variables take
//! precedence over the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sbx_api::{Client, RetryPolicy};
use sbx_limiter::{LimiterConfig, SpaceLimiter};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "sbx.toml";

/// Upper bound on concurrent plan workers
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Management API endpoint override
    pub base_url: Option<String>,
    /// Maximum number of concurrent plan workers
    pub workers: usize,
    pub limiter: LimiterConfig,
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            workers: DEFAULT_WORKERS,
            limiter: LimiterConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Parse configuration from TOML text
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a configuration file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    /// Load `explicit` if given, else `sbx.toml` in `dir` if present, else defaults
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate: PathBuf = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading configuration");
            return Self::load(&candidate);
        }

        Ok(Self::default())
    }

    /// Worker count, never zero
    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }

    /// Build a rate-limited client for `token`
    pub fn client(&self, token: &str) -> Result<Client> {
        let limiter = Arc::new(SpaceLimiter::new(self.limiter));
        let mut builder = Client::builder(token)
            .limiter(limiter)
            .retry_policy(self.retry);
        if let Some(base_url) = &self.base_url {
            builder = builder.base_url(base_url.as_str());
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = SyncConfig::parse("", Path::new("sbx.toml")).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.workers(), 4);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let content = r#"
workers = 2

[limiter]
write_rps = 3.0

[retry]
max_attempts = 3
"#;
        let config = SyncConfig::parse(content, Path::new("sbx.toml")).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.limiter.write_rps, 3.0);
        assert_eq!(config.limiter.read_rps, 7.0);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_ms, 250);
    }

    #[test]
    fn test_invalid_file_names_path() {
        let err = SyncConfig::parse("workers = \"many\"", Path::new("custom.toml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("custom.toml"));
    }

    #[test]
    fn test_resolve_prefers_explicit_then_working_dir() {
        let temp = TempDir::new().unwrap();
        assert_eq!(SyncConfig::resolve(None, temp.path()).unwrap(), SyncConfig::default());

        fs::write(temp.path().join(CONFIG_FILE_NAME), "workers = 3").unwrap();
        assert_eq!(SyncConfig::resolve(None, temp.path()).unwrap().workers, 3);

        let explicit = temp.path().join("other.toml");
        fs::write(&explicit, "workers = 1").unwrap();
        assert_eq!(SyncConfig::resolve(Some(&explicit), temp.path()).unwrap().workers, 1);
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let err = SyncConfig::resolve(Some(&temp.path().join("absent.toml")), temp.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_zero_workers_clamped() {
        let config = SyncConfig {
            workers: 0,
            ..SyncConfig::default()
        };
        assert_eq!(config.workers(), 1);
    }
}
