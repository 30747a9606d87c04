//! Create or verify an aggregate's tables

use super::StoreArgs;
use aggrel_store::BootstrapOutcome;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct BootstrapArgs {
    /// Descriptor file (.toml or .json)
    pub descriptor: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn execute(args: BootstrapArgs) -> Result<(), Box<dyn std::error::Error>> {
    let schema = super::compile_descriptor(&args.descriptor)?;
    let repo = super::open_repository(schema, &args.store)?;

    match repo.bootstrap()? {
        BootstrapOutcome::Created => {
            println!("Tables created:");
            println!("  aggregate: {}", repo.schema().type_name());
            println!("  tables: {}", 1 + repo.schema().children().len());
        }
        BootstrapOutcome::Unchanged => {
            println!("Tables unchanged:");
            println!("  aggregate: {}", repo.schema().type_name());
        }
    }
    println!("  fingerprint: {}", repo.schema().fingerprint());
    Ok(())
}
