use crate::domain::model::FetchSettings;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EnrichError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub fetch: Option<FetchConfig>,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub min_interval_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub retry_on_statuses: Option<Vec<u16>>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: String,
    pub votes_max_age_days: Option<i64>,
    pub favorites_max_age_days: Option<i64>,
    pub paid_access_max_age_days: Option<i64>,
    pub persist_per_signal: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EnrichError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EnrichError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}` placeholders with environment values,
    /// leaving unknown variables untouched.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_url("source.base_url", &self.source.base_url)?;
        crate::utils::validation::validate_path("cache.dir", &self.cache.dir)?;
        crate::utils::validation::validate_path("output.path", &self.output.path)?;

        let settings = self.fetch_settings();
        crate::utils::validation::validate_range("fetch.batch_size", settings.batch_size, 1, 100)?;
        crate::utils::validation::validate_range("fetch.concurrency", settings.concurrency, 1, 32)?;
        crate::utils::validation::validate_positive_number(
            "fetch.request_timeout_secs",
            settings.request_timeout_secs as usize,
            1,
        )?;

        for days in [
            self.votes_max_age_days(),
            self.favorites_max_age_days(),
            self.paid_access_max_age_days(),
        ] {
            if days < 0 {
                return Err(EnrichError::InvalidConfigValue {
                    field: "cache.*_max_age_days".to_string(),
                    value: days.to_string(),
                    reason: "Freshness window cannot be negative".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        let defaults = FetchSettings::default();
        let Some(fetch) = &self.fetch else {
            return defaults;
        };
        FetchSettings {
            batch_size: fetch.batch_size.unwrap_or(defaults.batch_size),
            concurrency: fetch.concurrency.unwrap_or(defaults.concurrency),
            min_interval_ms: fetch.min_interval_ms.unwrap_or(defaults.min_interval_ms),
            max_retries: fetch.max_retries.unwrap_or(defaults.max_retries),
            base_delay_ms: fetch.base_delay_ms.unwrap_or(defaults.base_delay_ms),
            max_delay_ms: fetch.max_delay_ms.unwrap_or(defaults.max_delay_ms),
            retry_on_statuses: fetch
                .retry_on_statuses
                .clone()
                .unwrap_or(defaults.retry_on_statuses),
            request_timeout_secs: fetch
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
        }
    }

    pub fn votes_max_age_days(&self) -> i64 {
        self.cache.votes_max_age_days.unwrap_or(7)
    }

    pub fn favorites_max_age_days(&self) -> i64 {
        self.cache.favorites_max_age_days.unwrap_or(7)
    }

    pub fn paid_access_max_age_days(&self) -> i64 {
        self.cache.paid_access_max_age_days.unwrap_or(30)
    }
}

impl ConfigProvider for TomlConfig {
    fn api_base_url(&self) -> &str {
        &self.source.base_url
    }

    fn cache_dir(&self) -> &str {
        &self.cache.dir
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn fetch_settings(&self) -> FetchSettings {
        self.fetch_settings()
    }

    fn votes_max_age_days(&self) -> i64 {
        self.votes_max_age_days()
    }

    fn favorites_max_age_days(&self) -> i64 {
        self.favorites_max_age_days()
    }

    fn paid_access_max_age_days(&self) -> i64 {
        self.paid_access_max_age_days()
    }

    fn persist_per_signal(&self) -> bool {
        self.cache.persist_per_signal.unwrap_or(true)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
