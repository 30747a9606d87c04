//! aggrel CLI
//!
//! Command-line interface for inspecting aggregate schemas and stores

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "aggrel")]
#[command(about = "aggrel - Aggregate-to-relational persistence tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print table layouts and DDL for a descriptor file
    Schema(commands::schema::SchemaArgs),
    /// Create an aggregate's tables, or verify them if they exist
    Bootstrap(commands::bootstrap::BootstrapArgs),
    /// Print a stored aggregate as JSON
    Inspect(commands::inspect::InspectArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Schema(args) => commands::schema::execute(args),
        Commands::Bootstrap(args) => commands::bootstrap::execute(args),
        Commands::Inspect(args) => commands::inspect::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
