use crate::core::series::DataFunction;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::Path, path::PathBuf};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_KEY_FILE: &str = "av.key";
pub const DEFAULT_DIVISOR: u32 = 22;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AlphaVantageConfig {
    pub base_url: String,
    pub key_file: PathBuf,
    /// Minimum spacing between two requests, the free tier allows 5 calls per minute.
    pub request_interval_secs: u64,
    /// Extra attempts after a failed request.
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        AlphaVantageConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            request_interval_secs: 15,
            retries: 1,
            retry_delay_ms: 1000,
        }
    }
}

impl AlphaVantageConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_secs(self.request_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// How accumulated monthly sums are turned into averages.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Averaging {
    /// Divide every sum by the same constant (approximate trading days per month).
    FixedDivisor { divisor: u32 },
    /// Divide every sum by the number of values that contributed to it.
    ContributingDays,
}

impl Default for Averaging {
    fn default() -> Self {
        Averaging::FixedDivisor {
            divisor: DEFAULT_DIVISOR,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub alpha_vantage: AlphaVantageConfig,
    pub functions: Vec<DataFunction>,
    pub output_dir: PathBuf,
    pub averaging: Averaging,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            alpha_vantage: AlphaVantageConfig::default(),
            functions: vec![
                DataFunction::TimeSeriesDailyAdjusted,
                DataFunction::Overview,
                DataFunction::IncomeStatement,
                DataFunction::BalanceSheet,
                DataFunction::CashFlow,
                DataFunction::Earnings,
            ],
            output_dir: PathBuf::from("."),
            averaging: Averaging::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no config file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "avmonthly", "avmonthly")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Averaging::FixedDivisor { divisor: 0 } = self.averaging {
            bail!("averaging.divisor must be greater than zero");
        }
        if self.functions.is_empty() {
            bail!("At least one function must be configured");
        }
        Ok(())
    }

    /// Reads the API key once. A missing or empty key file is fatal for the run.
    pub fn read_api_key(&self) -> Result<String> {
        let path = &self.alpha_vantage.key_file;
        let key = fs::read_to_string(path)
            .with_context(|| format!("Failed to read API key file: {}", path.display()))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("API key file is empty: {}", path.display());
        }
        debug!("Read API key from {}", path.display());
        Ok(key.to_string())
    }
}
