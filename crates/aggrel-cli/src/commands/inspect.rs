//! Load one aggregate as a dynamic record and print it

use super::StoreArgs;
use clap::Args;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Descriptor file (.toml or .json)
    pub descriptor: PathBuf,

    /// Aggregate id
    #[arg(long)]
    pub id: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn execute(args: InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let id = Uuid::parse_str(&args.id).map_err(|e| format!("invalid id {}: {}", args.id, e))?;
    let schema = super::compile_descriptor(&args.descriptor)?;
    let repo = super::open_repository(schema, &args.store)?;

    let record = repo.load_record(id)?;
    let child_rows: serde_json::Map<String, serde_json::Value> = repo
        .count_child_rows(id)?
        .into_iter()
        .map(|(table, rows)| (table, serde_json::Value::from(rows)))
        .collect();

    let output = serde_json::json!({
        "aggregate": repo.schema().type_name(),
        "id": id.to_string(),
        "record": record.to_json(),
        "child_rows": child_rows,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
