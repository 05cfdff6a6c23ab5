//! BDI Ingest - dataset validation tool

use std::sync::Arc;

use anyhow::Result;
use bdi_common::logging::{init_logging, LogConfig, LogLevel};
use bdi_ingest::config::ProjectConfig;
use bdi_ingest::processor::DatasetProcessor;
use bdi_ingest::reader::{ReaderRegistry, ReaderType, RecordMetadata, SHEET_NAME_KEY};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "bdi-ingest")]
#[command(author, version, about = "BDI dataset validation tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Validate a dataset file against a project configuration
    Validate {
        /// Dataset file (csv, tsv, txt, xls, xlsx)
        #[arg(short, long)]
        file: String,

        /// Project configuration JSON file
        #[arg(short, long)]
        config: String,

        /// Worksheet/section the records live on
        #[arg(short, long, default_value = "Samples")]
        sheet: String,

        /// Reader type to select
        #[arg(long, default_value = "tabular")]
        reader_type: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the CLI flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .build()
        .overlay_env()?;

    init_logging(&log_config)?;

    match cli.command {
        Command::Validate {
            file,
            config,
            sheet,
            reader_type,
        } => {
            info!(file = %file, config = %config, "Validating dataset");

            let project_config = Arc::new(ProjectConfig::from_file(&config)?);
            let registry = ReaderRegistry::new();

            let mut metadata = RecordMetadata::new(ReaderType::new(reader_type));
            metadata.add(SHEET_NAME_KEY, sheet);

            let mut processor = DatasetProcessor::new(project_config, &file, metadata);
            let accepted = processor.validate(&registry)?;

            println!("{}", serde_json::to_string_pretty(processor.messages())?);

            if !accepted {
                info!("Dataset rejected");
                std::process::exit(1);
            }

            info!("Dataset accepted");
        },
    }

    Ok(())
}
