pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use enquote_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "enquote",
    about = "Enquote quoting engine CLI",
    long_about = "Validate authored question graphs, inspect effective configuration, and run scripted quote sessions end to end.",
    after_help = "Examples:\n  enquote validate graphs/court_marking.json\n  enquote config\n  enquote quote graphs/parquet.json --answers answers.json --catalog prices.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Eagerly validate an authored service definition and report its shape")]
    Validate {
        #[arg(help = "Path to the service definition JSON file")]
        graph: PathBuf,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Run a scripted answer session against a price catalog and emit the quote")]
    Quote {
        #[arg(help = "Path to the service definition JSON file")]
        graph: PathBuf,
        #[arg(long, help = "Path to a JSON array of raw answers, in asking order")]
        answers: PathBuf,
        #[arg(long, help = "Path to a JSON array of catalog price entries")]
        catalog: PathBuf,
        #[arg(long, help = "Path to a JSON array of price adjustments (overrides config)")]
        adjustments: Option<PathBuf>,
    },
}

fn init_logging(config: &AppConfig) {
    use enquote_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub fn run() -> ExitCode {
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate { graph } => commands::validate::run(&graph),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Quote { graph, answers, catalog, adjustments } => {
            commands::quote::run(&graph, &answers, &catalog, adjustments.as_deref())
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
