pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "pricewise",
    about = "Pricewise operator CLI",
    long_about = "Operate the Pricewise pricing runtime: migrations, catalog seeding, config inspection, readiness checks, one-off optimization passes and sales reports.",
    after_help = "Examples:\n  pricewise doctor --json\n  pricewise optimize --product prod-003\n  pricewise report"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the starter product catalog when the database has no products")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, demand model, database, schema and catalog readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run a single price optimization pass and report what changed")]
    Optimize {
        #[arg(long, help = "Optimize only this product id")]
        product: Option<String>,
    },
    #[command(about = "Print the trailing 24h sales and activity snapshot as JSON")]
    Report,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Optimize { product } => commands::optimize::run(product),
        Command::Report => commands::report::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
