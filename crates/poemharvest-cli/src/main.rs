use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use poemharvest_acquire::wiki::DEFAULT_API_URL;
use poemharvest_acquire::{output, WikiClient};
use poemharvest_model::RecordOutcome;

#[derive(Parser)]
#[command(name = "poemharvest")]
#[command(about = "Harvest poems and their metadata from a wiki")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long, global = true)]
    utc: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest every poem linked from the index page and write one JSON file per poem
    Harvest {
        /// Title of the index page whose links list the poem pages
        #[arg(short, long, default_value = "Liste der Gedichte")]
        index: String,

        /// MediaWiki API endpoint
        #[arg(long, default_value = DEFAULT_API_URL)]
        api_url: String,

        /// Output directory for poem record files
        #[arg(short = 'O', long, default_value = "data")]
        output_dir: String,

        /// Stop after this many pages
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Extract a poem record from a local markup file
    Extract {
        /// Path to a file holding the raw page markup
        input: String,

        /// Write the record JSON here instead of printing it
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Validate a poem record file, or every record in a directory
    Validate {
        /// Path to a .json record or a directory of them
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Map log level, keeping the HTTP stack quiet at debug/trace
    let level = match cli.log_level {
        LogLevel::Error => "error",
        LogLevel::Warn  => "warn",
        LogLevel::Info  => "info",
        LogLevel::Debug => "debug,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn",
        LogLevel::Trace => "trace,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    if cli.utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }

    match cli.command {
        Commands::Harvest {
            index,
            api_url,
            output_dir,
            limit,
        } => {
            tracing::info!(index = %index, api = %api_url, output = %output_dir, "Harvesting poems");
            let client = WikiClient::new(&api_url)?;

            let mut records = Vec::new();
            let stats = poemharvest_acquire::harvest(&client, &index, limit, &mut records)
                .await
                .with_context(|| format!("Failed to list pages linked from '{index}'"))?;

            let paths = output::write_records(&records, &output_dir)?;
            tracing::info!(
                attempted = stats.attempted,
                succeeded = stats.succeeded,
                written = paths.len(),
                path = %output_dir,
                "Wrote poem records"
            );
        }
        Commands::Extract { input, output } => {
            tracing::info!(input = %input, "Extracting poem");
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {input}"))?;
            let raw = poemharvest_acquire::normalize::normalize_markup(&raw);

            match poemharvest_parse::process_page(&raw)? {
                RecordOutcome::Accepted(record) => {
                    let json = serde_json::to_string_pretty(&record)?;
                    match output {
                        Some(path) => {
                            std::fs::write(&path, &json)?;
                            tracing::info!(path = %path, title = %record.title, "Wrote poem record");
                        }
                        None => println!("{json}"),
                    }
                }
                RecordOutcome::Rejected { length } => {
                    tracing::warn!(length, "Poem too long, no record written");
                }
            }
        }
        Commands::Validate { path } => {
            tracing::info!(path = %path, "Validating");
            let summary = poemharvest_validate::validate(&path)?;
            if summary.invalid > 0 {
                anyhow::bail!("{} of {} records are invalid", summary.invalid, summary.files);
            }
        }
    }

    Ok(())
}
