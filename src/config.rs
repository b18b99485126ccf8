//! Client configuration loaded from `waste-perf.toml`.
//!
//! Values from the file are overridden by `PERF_API_BASE` and
//! `PERF_API_TOKEN` when those are set.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::filters::Filters;

pub const DEFAULT_CONFIG_FILE: &str = "waste-perf.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfConfig {
    /// Base URL the fixed `/performance/...` paths are appended to
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Refresh interval for `watch`
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Persisted default filters
    #[serde(default)]
    pub filters: Filters,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token: None,
            request_timeout_secs: default_request_timeout(),
            poll_interval_secs: default_poll_interval(),
            filters: Filters::default(),
        }
    }
}

fn default_api_base() -> String {
    "http://localhost:5000/api".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    30
}

impl PerfConfig {
    /// Explicit path must exist; otherwise the default file is used when present.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(
            std::env::var("PERF_API_BASE").ok(),
            std::env::var("PERF_API_TOKEN").ok(),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self, api_base: Option<String>, token: Option<String>) {
        if let Some(base) = api_base.filter(|value| !value.trim().is_empty()) {
            self.api_base = base;
        }
        if let Some(token) = token.filter(|value| !value.trim().is_empty()) {
            self.token = Some(token);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let base = self.api_base.trim();
        if base.is_empty() {
            bail!("api_base must not be empty");
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            bail!("api_base must start with http:// or https:// (got {base})");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Period;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = PerfConfig::parse("").unwrap();
        assert_eq!(config.api_base, "http://localhost:5000/api");
        assert_eq!(config.filters, Filters::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn filters_table_overrides_defaults() {
        let config = PerfConfig::parse(
            r#"
            api_base = "https://waste.example.org/api"
            token = "abc"

            [filters]
            period = "all-time"
            zone = "north"
            "#,
        )
        .unwrap();

        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.filters.period, Some(Period::AllTime));
        assert_eq!(config.filters.zone.as_deref(), Some("north"));
        assert_eq!(config.filters.limit, Some(10));
        assert_eq!(config.filters.months, Some(6));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = PerfConfig::default();
        config.apply_env(
            Some("https://prod.example.org/api".to_string()),
            Some("secret".to_string()),
        );
        assert_eq!(config.api_base, "https://prod.example.org/api");
        assert_eq!(config.token.as_deref(), Some("secret"));

        config.apply_env(Some(String::new()), None);
        assert_eq!(config.api_base, "https://prod.example.org/api");
    }

    #[test]
    fn rejects_bad_base_and_zero_interval() {
        let mut config = PerfConfig {
            api_base: "ftp://nope".to_string(),
            ..PerfConfig::default()
        };
        assert!(config.validate().is_err());

        config.api_base = "http://localhost/api".to_string();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval_secs = 5").unwrap();
        let config = PerfConfig::from_file(file.path()).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(PerfConfig::load(Some(missing.as_path())).is_err());
    }
}
