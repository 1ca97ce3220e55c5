use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::EstimatorResult;
use crate::estimator::classify::DEFAULT_SHORTS_MAX_DURATION_SECS;
use crate::estimator::growth::DEFAULT_GROWTH_EXPONENT;
use crate::estimator::{
    AnalysisWindow, CohortEstimator, GrowthCurve, KindFilter, RateCalculator, RatePolicy,
};

pub const DEFAULT_YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_server: ServerConfig,
    pub estimator: EstimatorConfig,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings shared by every estimation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub growth_exponent: f64,
    /// Cohort horizon when a request does not name one.
    /// If None, the oldest video in the batch sets the horizon.
    pub default_max_days: Option<u32>,
    pub rate_policy: RatePolicy,
    pub windows: Vec<AnalysisWindow>,
    pub shorts_max_duration_secs: u64,
    pub kind_filter: KindFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderBackend {
    None,
    Youtube,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub backend: ProviderBackend,
    #[serde(default)]
    pub youtube: Option<YouTubeConfig>,
    /// JSON snapshot file used by the file backend
    #[serde(default)]
    pub snapshot_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    pub api_key: String,
    #[serde(default = "YouTubeConfig::default_base_url")]
    pub base_url: String,
}

impl YouTubeConfig {
    fn default_base_url() -> String {
        DEFAULT_YOUTUBE_API_BASE_URL.to_string()
    }
}

impl EstimatorConfig {
    pub fn growth_curve(&self) -> EstimatorResult<GrowthCurve> {
        GrowthCurve::new(self.growth_exponent)
    }

    pub fn rate_calculator(&self) -> EstimatorResult<RateCalculator> {
        Ok(RateCalculator::new(self.rate_policy, self.windows.clone())?
            .with_shorts_threshold(self.shorts_max_duration_secs))
    }

    pub fn cohort_estimator(&self, max_days: u32) -> EstimatorResult<CohortEstimator> {
        Ok(CohortEstimator::new(self.growth_curve()?, max_days)?
            .with_filter(self.kind_filter)
            .with_shorts_threshold(self.shorts_max_duration_secs))
    }

    /// Check that the settings can build both estimators
    pub fn validate(&self) -> EstimatorResult<()> {
        self.rate_calculator()?;
        self.cohort_estimator(self.default_max_days.unwrap_or(0))?;
        Ok(())
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            growth_exponent: DEFAULT_GROWTH_EXPONENT,
            default_max_days: None,
            rate_policy: RatePolicy::ClampedLifetime,
            windows: AnalysisWindow::defaults(),
            shorts_max_duration_secs: DEFAULT_SHORTS_MAX_DURATION_SECS,
            kind_filter: KindFilter::All,
        }
    }
}

/// Parse a comma-separated window list such as `24h,3d,7d`
pub fn parse_windows(value: &str) -> EstimatorResult<Vec<AnalysisWindow>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_host = var("API_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let api_port = var("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let growth_exponent = match var("GROWTH_EXPONENT") {
            Some(v) => v
                .parse::<f64>()
                .context("GROWTH_EXPONENT must be a number")?,
            None => DEFAULT_GROWTH_EXPONENT,
        };

        let default_max_days = var("DEFAULT_MAX_DAYS")
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("DEFAULT_MAX_DAYS must be a non-negative integer")?;

        let decay_seed = var("RATE_DECAY_SEED")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("RATE_DECAY_SEED must be an unsigned integer")?
            .unwrap_or(0);
        let decay_jitter = var("RATE_DECAY_JITTER")
            .map(|v| v.parse::<f64>())
            .transpose()
            .context("RATE_DECAY_JITTER must be a number")?
            .unwrap_or(0.0);

        let rate_policy = match var("RATE_POLICY")
            .unwrap_or_else(|| "clamped".to_string())
            .to_lowercase()
            .as_str()
        {
            "clamped" | "clamped_lifetime" => RatePolicy::ClampedLifetime,
            "decay" | "decay_multiplier" => RatePolicy::DecayMultiplier {
                seed: decay_seed,
                jitter: decay_jitter,
            },
            other => {
                tracing::warn!(
                    "Unknown RATE_POLICY '{other}', falling back to 'clamped'. Supported values: clamped, decay"
                );
                RatePolicy::ClampedLifetime
            }
        };

        let windows = match var("RATE_WINDOWS") {
            Some(v) => parse_windows(&v).context("RATE_WINDOWS is invalid")?,
            None => AnalysisWindow::defaults(),
        };

        let shorts_max_duration_secs = var("SHORTS_MAX_DURATION_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("SHORTS_MAX_DURATION_SECS must be an unsigned integer")?
            .unwrap_or(DEFAULT_SHORTS_MAX_DURATION_SECS);

        let kind_filter = var("KIND_FILTER")
            .map(|v| v.parse::<KindFilter>())
            .transpose()
            .context("KIND_FILTER is invalid")?
            .unwrap_or_default();

        let estimator = EstimatorConfig {
            growth_exponent,
            default_max_days,
            rate_policy,
            windows,
            shorts_max_duration_secs,
            kind_filter,
        };
        estimator
            .validate()
            .context("estimator settings are invalid")?;

        let backend = match var("PROVIDER")
            .unwrap_or_else(|| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "youtube" => ProviderBackend::Youtube,
            "file" => ProviderBackend::File,
            "none" => ProviderBackend::None,
            other => {
                tracing::warn!(
                    "Unknown PROVIDER '{other}', falling back to 'none'. Supported values: none, youtube, file"
                );
                ProviderBackend::None
            }
        };

        let youtube = if matches!(backend, ProviderBackend::Youtube) {
            let api_key = var("YOUTUBE_API_KEY")
                .context("YOUTUBE_API_KEY must be set when PROVIDER=youtube")?;
            let base_url = var("YOUTUBE_API_BASE_URL")
                .unwrap_or_else(YouTubeConfig::default_base_url);
            Some(YouTubeConfig { api_key, base_url })
        } else {
            None
        };

        let snapshot_file = var("SNAPSHOT_FILE");
        if matches!(backend, ProviderBackend::File) && snapshot_file.is_none() {
            anyhow::bail!("SNAPSHOT_FILE must be set when PROVIDER=file");
        }

        Ok(Config {
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            estimator,
            provider: ProviderConfig {
                backend,
                youtube,
                snapshot_file,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_server.host, "127.0.0.1");
        assert_eq!(config.api_server.port, 8080);
        assert_eq!(config.estimator, EstimatorConfig::default());
        assert!(matches!(config.provider.backend, ProviderBackend::None));
    }

    #[test]
    fn test_decay_policy_from_vars() {
        let config = config_from(&[
            ("RATE_POLICY", "decay"),
            ("RATE_DECAY_SEED", "99"),
            ("RATE_DECAY_JITTER", "0.1"),
            ("RATE_WINDOWS", "12h, 2d"),
            ("GROWTH_EXPONENT", "0.85"),
            ("DEFAULT_MAX_DAYS", "45"),
            ("KIND_FILTER", "long_form"),
        ])
        .unwrap();
        assert_eq!(
            config.estimator.rate_policy,
            RatePolicy::DecayMultiplier {
                seed: 99,
                jitter: 0.1
            }
        );
        assert_eq!(
            config.estimator.windows,
            vec![AnalysisWindow::hours(12), AnalysisWindow::days(2)]
        );
        assert_eq!(config.estimator.growth_exponent, 0.85);
        assert_eq!(config.estimator.default_max_days, Some(45));
        assert_eq!(config.estimator.kind_filter, KindFilter::LongForm);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        assert!(config_from(&[("GROWTH_EXPONENT", "1.5")]).is_err());
        assert!(config_from(&[("RATE_WINDOWS", "3w")]).is_err());
        assert!(config_from(&[("RATE_POLICY", "decay"), ("RATE_DECAY_JITTER", "2")]).is_err());
        assert!(config_from(&[("API_PORT", "http")]).is_err());
        assert!(config_from(&[("DEFAULT_MAX_DAYS", "4294967295")]).is_err());
    }

    #[test]
    fn test_provider_requirements() {
        assert!(config_from(&[("PROVIDER", "youtube")]).is_err());
        assert!(config_from(&[("PROVIDER", "file")]).is_err());

        let config = config_from(&[("PROVIDER", "youtube"), ("YOUTUBE_API_KEY", "k")]).unwrap();
        let youtube = config.provider.youtube.unwrap();
        assert_eq!(youtube.api_key, "k");
        assert_eq!(youtube.base_url, DEFAULT_YOUTUBE_API_BASE_URL);
    }
}
