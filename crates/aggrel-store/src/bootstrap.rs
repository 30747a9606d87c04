//! Schema bootstrap
//!
//! Creates an aggregate's tables once and records the DDL fingerprint in
//! `aggrel_schema_version`. Later runs compare fingerprints: equal is a
//! no-op, different is reported as drift. Nothing is ever migrated.

use crate::connection::Connection;
use crate::errors::{backend, schema_drift, Result};
use aggrel_core::codec::format_datetime;
use aggrel_core::{CompiledSchema, SqlValue};
use aggrel_core_types::schema::{OP_BOOTSTRAP, OP_CREATE_TABLES};

/// Bookkeeping table name
pub const VERSION_TABLE: &str = "aggrel_schema_version";

const CREATE_VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS \"aggrel_schema_version\" (
    \"aggregate\" TEXT NOT NULL PRIMARY KEY,
    \"fingerprint\" TEXT NOT NULL,
    \"applied_at\" TEXT NOT NULL
)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Tables were created and the fingerprint recorded
    Created,
    /// Tables already exist with the same fingerprint
    Unchanged,
}

/// Execute the schema's DDL (root table first)
///
/// # Errors
///
/// Fails if any table already exists or the backend rejects a statement.
pub fn create_tables<C: Connection>(conn: &mut C, schema: &CompiledSchema) -> Result<usize> {
    let statements = schema.create_table_statements();
    conn.transaction(|conn| {
        for statement in &statements {
            conn.execute(statement, &[])
                .map_err(backend(OP_CREATE_TABLES))?;
        }
        Ok(statements.len())
    })
}

/// Stored fingerprint for an aggregate, if bootstrapped
///
/// # Errors
///
/// Fails if the bookkeeping table cannot be read.
pub fn stored_fingerprint<C: Connection>(
    conn: &mut C,
    schema: &CompiledSchema,
) -> Result<Option<String>> {
    conn.execute(CREATE_VERSION_TABLE, &[])
        .map_err(backend(OP_BOOTSTRAP))?;
    let rows = conn
        .query(
            "SELECT \"fingerprint\" FROM \"aggrel_schema_version\" WHERE \"aggregate\" = ?1",
            &[SqlValue::Text(schema.type_name().to_string())],
        )
        .map_err(backend(OP_BOOTSTRAP))?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|row| row.get("fingerprint").and_then(|v| v.as_str().map(str::to_string))))
}

/// Create tables on first run; verify the fingerprint afterwards
///
/// # Errors
///
/// Returns `Unknown` ("schema drift") when the recorded fingerprint differs
/// from the compiled schema, or a classified backend error.
pub fn bootstrap<C: Connection>(conn: &mut C, schema: &CompiledSchema) -> Result<BootstrapOutcome> {
    let fingerprint = schema.fingerprint();
    conn.transaction(|conn| match stored_fingerprint(conn, schema)? {
        Some(stored) if stored == fingerprint => Ok(BootstrapOutcome::Unchanged),
        Some(stored) => Err(schema_drift(schema.type_name(), &stored, &fingerprint)),
        None => {
            create_tables(conn, schema)?;
            conn.execute(
                "INSERT INTO \"aggrel_schema_version\" (\"aggregate\", \"fingerprint\", \"applied_at\") VALUES (?1, ?2, ?3)",
                &[
                    SqlValue::Text(schema.type_name().to_string()),
                    SqlValue::Text(fingerprint.clone()),
                    SqlValue::Text(format_datetime(&chrono::Utc::now())),
                ],
            )
            .map_err(backend(OP_BOOTSTRAP))?;
            Ok(BootstrapOutcome::Created)
        }
    })
}
