pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use crate::domain::model::FetchSettings;
    use crate::domain::ports::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "universe-enrich")]
    #[command(about = "Enriches game universe ids with votes, favorites, and paid-access signals")]
    pub struct CliConfig {
        /// JSON file with the subject seed records.
        #[arg(long)]
        pub input: String,

        #[arg(long, default_value = "https://games.roblox.com")]
        pub api_base_url: String,

        #[arg(long, default_value = "./cache")]
        pub cache_dir: String,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        /// Optional TOML config; when given it replaces the CLI knobs.
        #[arg(long)]
        pub config: Option<String>,

        #[arg(long, default_value = "100")]
        pub batch_size: usize,

        #[arg(long, default_value = "4")]
        pub concurrency: usize,

        #[arg(long, default_value = "250")]
        pub min_interval_ms: u64,

        #[arg(long, default_value = "3")]
        pub max_retries: u32,

        #[arg(long, default_value = "500")]
        pub base_delay_ms: u64,

        #[arg(long, default_value = "8000")]
        pub max_delay_ms: u64,

        #[arg(long, value_delimiter = ',', default_values_t = vec![408u16, 429, 500, 502, 503, 504])]
        pub retry_on_statuses: Vec<u16>,

        #[arg(long, default_value = "30")]
        pub request_timeout_secs: u64,

        #[arg(long, default_value = "7")]
        pub votes_max_age_days: i64,

        #[arg(long, default_value = "7")]
        pub favorites_max_age_days: i64,

        #[arg(long, default_value = "30")]
        pub paid_access_max_age_days: i64,

        /// Save caches once at run end instead of after each signal.
        #[arg(long)]
        pub persist_at_end: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,
    }

    impl ConfigProvider for CliConfig {
        fn api_base_url(&self) -> &str {
            &self.api_base_url
        }

        fn cache_dir(&self) -> &str {
            &self.cache_dir
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn fetch_settings(&self) -> FetchSettings {
            FetchSettings {
                batch_size: self.batch_size,
                concurrency: self.concurrency,
                min_interval_ms: self.min_interval_ms,
                max_retries: self.max_retries,
                base_delay_ms: self.base_delay_ms,
                max_delay_ms: self.max_delay_ms,
                retry_on_statuses: self.retry_on_statuses.clone(),
                request_timeout_secs: self.request_timeout_secs,
            }
        }

        fn votes_max_age_days(&self) -> i64 {
            self.votes_max_age_days
        }

        fn favorites_max_age_days(&self) -> i64 {
            self.favorites_max_age_days
        }

        fn paid_access_max_age_days(&self) -> i64 {
            self.paid_access_max_age_days
        }

        fn persist_per_signal(&self) -> bool {
            !self.persist_at_end
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_url("api_base_url", &self.api_base_url)?;
            validation::validate_path("cache_dir", &self.cache_dir)?;
            validation::validate_path("output_path", &self.output_path)?;
            validation::validate_path("input", &self.input)?;
            validation::validate_range("batch_size", self.batch_size, 1, 100)?;
            validation::validate_range("concurrency", self.concurrency, 1, 32)?;
            validation::validate_positive_number(
                "request_timeout_secs",
                self.request_timeout_secs as usize,
                1,
            )?;
            Ok(())
        }
    }
}
