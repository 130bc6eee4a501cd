//! Scrape configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! command-line flags. A YAML file only needs the keys it wants to change:
//!
//! ```yaml
//! rollback_months: 6
//! step: calendar_months
//! suppress_errors: true
//! request_delay_ms: 2000
//! max_concurrent_sources: 2
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

use crate::archive::StepMode;
use crate::cli::Cli;
use crate::error::ScrapeError;
use crate::scrapers::STRATEGY_NAMES;

pub const DEFAULT_USER_AGENT: &str = concat!("awful_archive_scraper/", env!("CARGO_PKG_VERSION"));

/// Everything a batch run needs to know besides the source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Months to roll back from the current month.
    pub rollback_months: u32,
    pub step: StepMode,
    /// Drop failing sources instead of aborting the batch.
    pub suppress_errors: bool,
    pub timeout_secs: u64,
    /// Pause before each archive page request within a source.
    pub request_delay_ms: u64,
    /// Sources scraped at the same time. Pages within a source are always sequential.
    pub max_concurrent_sources: usize,
    /// Retries for transport failures. `0` means a single attempt.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub user_agent: String,
    /// Extraction strategy name, see [`crate::scrapers::strategy_by_name`].
    pub strategy: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            rollback_months: 1,
            step: StepMode::ThirtyDays,
            suppress_errors: false,
            timeout_secs: 30,
            request_delay_ms: 1000,
            max_concurrent_sources: 1,
            max_retries: 0,
            retry_base_delay_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            strategy: crate::scrapers::stream::NAME.to_string(),
        }
    }
}

impl ScrapeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Parse a YAML config document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ScrapeError> {
        serde_yaml::from_str(yaml).map_err(|e| ScrapeError::Config(format!("invalid config: {e}")))
    }

    /// Load a YAML config file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScrapeError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml(&yaml)?;
        info!("Loaded configuration file");
        Ok(config)
    }

    /// Defaults, overlaid with `--config` if given, overlaid with CLI flags.
    pub fn resolve(cli: &Cli) -> Result<Self, ScrapeError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(rollback) = cli.rollback {
            self.rollback_months = rollback;
        }
        if let Some(step) = cli.step {
            self.step = step;
        }
        self.suppress_errors |= cli.suppress_errors;
        if let Some(secs) = cli.timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(ms) = cli.delay_ms {
            self.request_delay_ms = ms;
        }
        if let Some(n) = cli.concurrency {
            self.max_concurrent_sources = n;
        }
        if let Some(n) = cli.max_retries {
            self.max_retries = n;
        }
        if let Some(ua) = &cli.user_agent {
            self.user_agent = ua.clone();
        }
        if let Some(strategy) = &cli.strategy {
            self.strategy = strategy.clone();
        }
    }

    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.timeout_secs == 0 {
            return Err(ScrapeError::Config("timeout_secs must be at least 1".into()));
        }
        if self.max_concurrent_sources == 0 {
            return Err(ScrapeError::Config(
                "max_concurrent_sources must be at least 1".into(),
            ));
        }
        if !STRATEGY_NAMES.contains(&self.strategy.as_str()) {
            return Err(ScrapeError::Config(format!(
                "unknown extraction strategy {:?}",
                self.strategy
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScrapeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step, StepMode::ThirtyDays);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ScrapeConfig::from_yaml("rollback_months: 6\nstep: calendar_months\n").unwrap();
        assert_eq!(config.rollback_months, 6);
        assert_eq!(config.step, StepMode::CalendarMonths);
        assert_eq!(config.request_delay_ms, 1000);
    }

    #[test]
    fn test_bad_yaml_is_config_error() {
        assert!(matches!(
            ScrapeConfig::from_yaml("rollback_months: [nope]"),
            Err(ScrapeError::Config(_))
        ));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rollback_months: 6\nrequest_delay_ms: 5000").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from([
            "awful_archive_scraper",
            "--config",
            &path,
            "--rollback",
            "2",
            "--suppress-errors",
        ]);
        let config = ScrapeConfig::resolve(&cli).unwrap();
        assert_eq!(config.rollback_months, 2);
        assert_eq!(config.request_delay_ms, 5000);
        assert!(config.suppress_errors);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency_and_unknown_strategy() {
        let config = ScrapeConfig {
            max_concurrent_sources: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ScrapeConfig {
            strategy: "graphql".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
