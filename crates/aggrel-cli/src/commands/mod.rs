pub mod bootstrap;
pub mod inspect;
pub mod schema;

use aggrel_core::logging_facility;
use aggrel_core::{AggregateDescriptor, CompiledSchema, SchemaCompiler};
use aggrel_store::{DynamicRepository, SqliteConnection, StoreConfig, TransactionalRepository};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Database selection shared by commands that open a store
#[derive(Debug, Args)]
pub struct StoreArgs {
    /// SQLite database file (overrides `database_path` from --config)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Store configuration TOML file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Load a descriptor from a `.json` or `.toml` file
pub fn load_descriptor(path: &Path) -> Result<AggregateDescriptor, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read descriptor {}: {}", path.display(), e))?;
    let descriptor = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&text)?,
        Some("toml") => toml::from_str(&text)?,
        _ => {
            return Err(format!(
                "unsupported descriptor format: {} (expected .toml or .json)",
                path.display()
            )
            .into())
        }
    };
    Ok(descriptor)
}

pub fn compile_descriptor(path: &Path) -> Result<CompiledSchema, Box<dyn std::error::Error>> {
    let descriptor = load_descriptor(path)?;
    Ok(SchemaCompiler::compile(&descriptor)?)
}

/// Open a record-shaped repository for the schema
///
/// Logging is only initialised when a config file names a profile.
pub fn open_repository(
    schema: CompiledSchema,
    store: &StoreArgs,
) -> Result<DynamicRepository<SqliteConnection>, Box<dyn std::error::Error>> {
    let mut config = match &store.config {
        Some(path) => {
            let config = StoreConfig::from_toml_file(path)?;
            logging_facility::init(config.log_profile);
            config
        }
        None => StoreConfig::default(),
    };
    if let Some(db) = &store.db {
        config.database_path = db.to_string_lossy().into_owned();
    }
    if config.is_in_memory() {
        return Err("no database given: pass --db or a --config with database_path".into());
    }
    config.validate()?;

    let conn = SqliteConnection::from_config(config)?;
    Ok(TransactionalRepository::new(Arc::new(schema), conn))
}
