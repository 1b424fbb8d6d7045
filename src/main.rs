use anyhow::Context;
use clap::Parser;
use universe_enrich::domain::model::seeds_from_json;
use universe_enrich::utils::{logger, validation::Validate};
use universe_enrich::{write_outputs, CliConfig, EnrichEngine, TomlConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting universe-enrich");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let input = std::fs::read_to_string(&config.input)
        .with_context(|| format!("Failed to read input file {}", config.input))?;
    let seeds = seeds_from_json(&serde_json::from_str(&input)?)?;
    if seeds.is_empty() {
        eprintln!("❌ No usable subject ids in {}", config.input);
        std::process::exit(1);
    }

    let (records, output_dir) = match &config.config {
        Some(path) => {
            let toml_config = TomlConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path))?;
            toml_config.validate()?;
            let output_dir = toml_config.output.path.clone();
            (EnrichEngine::new(toml_config)?.run(&seeds).await, output_dir)
        }
        None => {
            let output_dir = config.output_path.clone();
            (EnrichEngine::new(config)?.run(&seeds).await, output_dir)
        }
    };

    match records {
        Ok(records) => {
            let (csv_path, json_path) = write_outputs(&records, &output_dir)?;
            tracing::info!("Enrichment completed: {} records", records.len());
            println!("✅ Enriched {} subjects", records.len());
            println!("📁 {}", csv_path.display());
            println!("📁 {}", json_path.display());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Enrichment run failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(2);
        }
    }
}
