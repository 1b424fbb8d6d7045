pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::engine::EnrichEngine;
pub use app::export::write_outputs;
pub use config::toml_config::TomlConfig;
pub use domain::model::{EnrichedSubject, SubjectId, SubjectSeed};
pub use utils::error::{EnrichError, Result};
