//! Print the relational layout compiled from a descriptor

use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Descriptor file (.toml or .json)
    pub descriptor: PathBuf,

    /// Print only the DDL statements
    #[arg(long)]
    pub ddl_only: bool,
}

pub fn execute(args: SchemaArgs) -> Result<(), Box<dyn std::error::Error>> {
    let schema = super::compile_descriptor(&args.descriptor)?;

    if !args.ddl_only {
        println!("Aggregate: {}", schema.type_name());
        println!("  resource_path: {}", schema.resource_path());
        println!("  fingerprint: {}", schema.fingerprint());
        println!("  root table: {}", schema.root_table());
        for child in schema.children() {
            println!(
                "  child table: {} ({} of {})",
                child.table_name(),
                child.collection.label(),
                child.field_label()
            );
        }
        println!();
    }

    for statement in schema.create_table_statements() {
        println!("{};", statement);
    }
    Ok(())
}
