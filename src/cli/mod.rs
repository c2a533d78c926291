//! CLI parser and dispatch.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::PipelineConfig;

#[derive(Parser)]
#[command(name = "docintel")]
#[command(about = "Multi-strategy OCR and text extraction for Vietnamese administrative documents")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./docintel.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Process a document and print the ProcessingResult as JSON
    Process {
        /// Input file (PDF, PNG or JPEG)
        file: PathBuf,

        /// Declared MIME type; detected from content when omitted
        #[arg(long)]
        mime: Option<String>,

        /// Recognition language hint (vie or eng)
        #[arg(long, env = "DOCINTEL_LANGUAGE")]
        language: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Report availability of OCR binaries and remote services
    Tools,

    /// Run the offline Vietnamese text cleaner
    Clean {
        /// Text to clean
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// File containing text to clean
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Process {
            file,
            mime,
            language,
            pretty,
        } => commands::process(config, file, mime, language, pretty).await,
        Commands::Tools => commands::tools(config).await,
        Commands::Clean { text, file } => commands::clean(text, file),
    }
}
