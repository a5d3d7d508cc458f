use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use leafscan::{format_tier_table, open_image, resolve_config, tier_table, write_outputs};
use leafseg::{AnalyzerConfig, LeafAnalyzer, PipelineBuilder, TractModelLoader};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment a leaf photo and grade disease severity
    Analyze {
        /// Path to the leaf image
        #[arg(short, long)]
        image: PathBuf,
        /// TOML or JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the leaf segmenter model path
        #[arg(long)]
        leaf_model: Option<PathBuf>,
        /// Override the disease segmenter model path
        #[arg(long)]
        disease_model: Option<PathBuf>,
        /// Where to write the output images and report.json
        #[arg(short, long, default_value = "leafscan-output")]
        output_dir: PathBuf,
    },
    /// Print the severity tier table
    Tiers {
        /// Emit JSON instead of a text table
        #[arg(long)]
        json: bool,
    },
    /// Print the configuration JSON schema
    Schema,
    /// Write the default configuration (.toml or .json)
    InitConfig {
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            image,
            config,
            leaf_model,
            disease_model,
            output_dir,
        } => {
            analyze(&image, config.as_deref(), leaf_model, disease_model, &output_dir).await?;
        }
        Commands::Tiers { json } => {
            let rows = tier_table();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", format_tier_table(&rows));
            }
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&AnalyzerConfig::schema())?);
        }
        Commands::InitConfig { output } => {
            AnalyzerConfig::default().to_file(&output)?;
            info!("Default configuration written to {:?}", output);
        }
    }

    Ok(())
}

async fn analyze(
    image_path: &Path,
    config_path: Option<&Path>,
    leaf_model: Option<PathBuf>,
    disease_model: Option<PathBuf>,
    output_dir: &Path,
) -> Result<()> {
    let config = resolve_config(config_path, leaf_model, disease_model)?;
    let loader = TractModelLoader::new(&config.models, config.preprocess.input_size);
    let analyzer = LeafAnalyzer::start(loader, PipelineBuilder::build_from_config(&config));

    // Decode while the models load
    let image = open_image(image_path)?;
    info!("Loaded {:?} ({}x{})", image_path, image.width(), image.height());

    analyzer.wait_until_loaded().await?;
    let report = analyzer.analyze(image).await?;

    println!("{}", report.assessment.severity_label());
    println!("{}", report.assessment.recommendation.render());

    let summary_path = write_outputs(&report, output_dir)?;
    info!(
        "Analysis took {} ms, report saved to {:?}",
        report.result.elapsed_millis(),
        summary_path
    );
    Ok(())
}
