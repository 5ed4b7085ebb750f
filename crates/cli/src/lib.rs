pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "storefront",
    about = "Storefront operator CLI",
    long_about = "Apply migrations, load the demo dataset, inspect store aggregates and the effective configuration.",
    after_help = "Examples:\n  storefront migrate\n  storefront seed\n  storefront stats --limit 5\n  storefront config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog and orders, then verify them")]
    Seed,
    #[command(about = "Print order count, product count, approved revenue and top best sellers")]
    Stats {
        #[arg(long, help = "Number of best sellers to include (defaults to catalog config)")]
        limit: Option<usize>,
    },
    #[command(about = "Print the effective configuration with secrets redacted")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Stats { limit } => commands::stats::run(limit),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
