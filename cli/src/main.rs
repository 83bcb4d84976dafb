mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ingrdnt_core::{
    JsonlScanHistory, MemoryScanHistory, ScanConfig, ScanError, ScanHistory, Scanner,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "ingrdnt")]
#[command(about = "Scan food products and flag their ingredients", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a barcode and analyze the product
    Scan {
        barcode: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Do not record this scan in the history file
        #[arg(long)]
        no_history: bool,
    },
    /// Analyze a raw ingredient list
    Analyze {
        text: String,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// List popular products in a category
    Alternatives {
        /// Category tag, e.g. en:sodas
        category: String,
        /// Print the suggestions as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent scans
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn init_telemetry() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_telemetry();

    let cli = Cli::parse();
    let config = ScanConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Scan {
            barcode,
            json,
            no_history,
        } => scan(&config, &barcode, json, no_history).await,
        Commands::Analyze { text, json } => {
            let scanner = ephemeral_scanner(&config)?;
            let records = scanner.aggregator().analyzer().analyze(Some(&text)).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                render::print_records(&records);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Alternatives { category, json } => {
            let scanner = ephemeral_scanner(&config)?;
            let suggestions = scanner
                .aggregator()
                .alternatives()
                .resolve("", &category)
                .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&suggestions)?);
            } else {
                render::print_alternatives(&suggestions);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::History { limit } => {
            let history = JsonlScanHistory::new(config.history_path.clone());
            let records = history
                .recent(limit)
                .await
                .with_context(|| format!("Failed to read {}", history.path().display()))?;
            render::print_history(&records);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn scan(config: &ScanConfig, barcode: &str, json: bool, no_history: bool) -> Result<ExitCode> {
    let scanner = if no_history {
        ephemeral_scanner(config)?
    } else {
        Scanner::from_config(config)?
    };

    tracing::debug!(barcode, history = !no_history, "scanning");
    match scanner.scan_barcode(barcode).await {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                render::print_scan(&result);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(ScanError::NotFound(code)) => {
            eprintln!("No product found for barcode {code:?}");
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e).context("Scan failed"),
    }
}

fn ephemeral_scanner(config: &ScanConfig) -> Result<Scanner> {
    Ok(Scanner::from_config_with_history(
        config,
        Arc::new(MemoryScanHistory::new()),
    )?)
}
