//! Error helpers for aggrel-store
//!
//! Backend failures become [`BackendError`]s carrying the SQLite result code
//! name; the core rule table turns them into [`RepoError`]s.

use aggrel_core::error_rules::{self, CONNECTION_CLOSED};
use aggrel_core::{BackendError, CodecError, RepoError, RepoErrorKind};
use rusqlite::ffi;

/// Result type alias using RepoError
pub type Result<T> = std::result::Result<T, RepoError>;

/// Convert a rusqlite error, keeping the SQLite result code name
pub fn from_rusqlite(err: rusqlite::Error) -> BackendError {
    let code = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(sqlite_code_name(failure)),
        _ => None,
    };
    let backend = BackendError::new(err.to_string()).with_source(err);
    match code {
        Some(code) => backend.with_code(code),
        None => backend,
    }
}

fn sqlite_code_name(failure: &ffi::Error) -> &'static str {
    match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_PRIMARYKEY => "SQLITE_CONSTRAINT_PRIMARYKEY",
        ffi::SQLITE_CONSTRAINT_UNIQUE => "SQLITE_CONSTRAINT_UNIQUE",
        ffi::SQLITE_CONSTRAINT_NOTNULL => "SQLITE_CONSTRAINT_NOTNULL",
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => "SQLITE_CONSTRAINT_FOREIGNKEY",
        ffi::SQLITE_CONSTRAINT_CHECK => "SQLITE_CONSTRAINT_CHECK",
        _ => match failure.code {
            ffi::ErrorCode::ConstraintViolation => "SQLITE_CONSTRAINT",
            ffi::ErrorCode::DatabaseBusy => "SQLITE_BUSY",
            ffi::ErrorCode::DatabaseLocked => "SQLITE_LOCKED",
            ffi::ErrorCode::CannotOpen => "SQLITE_CANTOPEN",
            ffi::ErrorCode::SystemIoFailure => "SQLITE_IOERR",
            ffi::ErrorCode::NotADatabase => "SQLITE_NOTADB",
            ffi::ErrorCode::ReadOnly => "SQLITE_READONLY",
            _ => "SQLITE_ERROR",
        },
    }
}

/// Error for any call on a closed connection
pub fn connection_closed() -> BackendError {
    BackendError::new("connection is not open").with_code(CONNECTION_CLOSED)
}

/// Classify a backend failure for `op`
pub fn backend(op: &str) -> impl FnOnce(BackendError) -> RepoError + '_ {
    move |err| error_rules::translate(err, op)
}

/// Reconstruction or flattening failure: `Unknown`, cause preserved
pub fn codec(op: &str, aggregate: &str, err: CodecError) -> RepoError {
    RepoError::new(RepoErrorKind::Unknown)
        .with_op(op)
        .with_aggregate(aggregate)
        .with_message(format!("mapping failed: {}", err))
        .with_cause(err)
}

/// Bootstrap found tables compiled from a different descriptor
pub fn schema_drift(aggregate: &str, stored: &str, compiled: &str) -> RepoError {
    RepoError::new(RepoErrorKind::Unknown)
        .with_op(aggrel_core_types::schema::OP_BOOTSTRAP)
        .with_aggregate(aggregate)
        .with_message(format!(
            "schema drift: stored fingerprint {} does not match compiled {}",
            stored, compiled
        ))
}
