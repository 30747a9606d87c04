//! SQLite backend

use crate::config::StoreConfig;
use crate::connection::{Connection, TxState};
use crate::errors::{connection_closed, from_rusqlite};
use aggrel_core::{BackendError, Row, SqlValue};
use rusqlite::types::Value as SqliteValue;
use std::time::Duration;

/// SQLite connection configured from a [`StoreConfig`]
pub struct SqliteConnection {
    config: StoreConfig,
    conn: Option<rusqlite::Connection>,
    tx: TxState,
}

impl SqliteConnection {
    /// Create a closed connection; call [`Connection::open`] before use
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            conn: None,
            tx: TxState::default(),
        }
    }

    /// Open and configure a connection
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the database cannot be opened or a
    /// pragma is rejected.
    pub fn from_config(config: StoreConfig) -> Result<Self, BackendError> {
        let mut connection = Self::new(config);
        connection.open()?;
        Ok(connection)
    }

    /// Open an in-memory database with default settings
    ///
    /// # Errors
    ///
    /// See [`SqliteConnection::from_config`].
    pub fn open_in_memory() -> Result<Self, BackendError> {
        Self::from_config(StoreConfig::in_memory())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn raw(&mut self) -> Result<&mut rusqlite::Connection, BackendError> {
        self.conn.as_mut().ok_or_else(connection_closed)
    }
}

fn configure(conn: &rusqlite::Connection, config: &StoreConfig) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    // In-memory databases report "memory" whatever mode is requested.
    let _mode: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.as_sql(),
        |row| row.get(0),
    )?;
    Ok(())
}

fn to_sqlite(value: &SqlValue) -> SqliteValue {
    match value {
        SqlValue::Null => SqliteValue::Null,
        SqlValue::Integer(i) => SqliteValue::Integer(*i),
        SqlValue::Real(f) => SqliteValue::Real(*f),
        SqlValue::Text(s) => SqliteValue::Text(s.clone()),
        SqlValue::Blob(b) => SqliteValue::Blob(b.clone()),
    }
}

fn from_sqlite(value: SqliteValue) -> SqlValue {
    match value {
        SqliteValue::Null => SqlValue::Null,
        SqliteValue::Integer(i) => SqlValue::Integer(i),
        SqliteValue::Real(f) => SqlValue::Real(f),
        SqliteValue::Text(s) => SqlValue::Text(s),
        SqliteValue::Blob(b) => SqlValue::Blob(b),
    }
}

impl Connection for SqliteConnection {
    fn open(&mut self) -> Result<(), BackendError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = if self.config.is_in_memory() {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&self.config.database_path)
        }
        .map_err(from_rusqlite)?;
        configure(&conn, &self.config).map_err(from_rusqlite)?;
        tracing::debug!(
            database_path = %self.config.database_path,
            journal_mode = self.config.journal_mode.as_sql(),
            "sqlite connection opened"
        );
        self.conn = Some(conn);
        self.tx = TxState::default();
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, err)| from_rusqlite(err)),
            None => Ok(()),
        }
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize, BackendError> {
        let conn = self.raw()?;
        conn.execute(sql, rusqlite::params_from_iter(params.iter().map(to_sqlite)))
            .map_err(from_rusqlite)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, BackendError> {
        let conn = self.raw()?;
        let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(to_sqlite)),
                |row| {
                    let mut out = Row::new();
                    for (i, name) in names.iter().enumerate() {
                        let value: SqliteValue = row.get(i)?;
                        out.insert(name.clone(), from_sqlite(value));
                    }
                    Ok(out)
                },
            )
            .map_err(from_rusqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    fn supports_cascade(&self) -> bool {
        self.config.foreign_keys
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        self.raw()?
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(from_rusqlite)
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.raw()?.execute_batch("COMMIT").map_err(from_rusqlite)
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.raw()?.execute_batch("ROLLBACK").map_err(from_rusqlite)
    }

    fn tx_state(&mut self) -> &mut TxState {
        &mut self.tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggrel_core::error_rules::classify;
    use aggrel_core::RepoErrorKind;

    #[test]
    fn test_round_trips_every_storage_class() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (a, b, c, d, e)", &[]).unwrap();
        let values = vec![
            SqlValue::Null,
            SqlValue::Integer(-7),
            SqlValue::Real(2.5),
            SqlValue::Text("hi".into()),
            SqlValue::Blob(vec![0, 1, 2]),
        ];
        assert_eq!(
            conn.execute("INSERT INTO t VALUES (?1, ?2, ?3, ?4, ?5)", &values)
                .unwrap(),
            1
        );
        let rows = conn.query("SELECT * FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("b"), Some(&SqlValue::Integer(-7)));
        assert_eq!(rows[0].get("e"), Some(&SqlValue::Blob(vec![0, 1, 2])));
    }

    #[test]
    fn test_foreign_keys_enabled_by_default() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        let rows = conn.query("PRAGMA foreign_keys", &[]).unwrap();
        assert_eq!(rows[0].get("foreign_keys"), Some(&SqlValue::Integer(1)));
        assert!(conn.supports_cascade());
    }

    #[test]
    fn test_closed_connection_fails_with_connection_kind() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.close().unwrap();
        assert!(!conn.is_open());
        let err = conn.query("SELECT 1", &[]).unwrap_err();
        assert_eq!(classify(&err), RepoErrorKind::Connection);

        conn.open().unwrap();
        assert!(conn.is_open());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (a INTEGER)", &[]).unwrap();
        let result: crate::Result<()> = conn.transaction(|c| {
            c.execute("INSERT INTO t VALUES (1)", &[])
                .map_err(crate::errors::backend("test"))?;
            c.execute("INSERT INTO missing VALUES (1)", &[])
                .map_err(crate::errors::backend("test"))?;
            Ok(())
        });
        assert!(result.is_err());
        let rows = conn.query("SELECT COUNT(*) AS n FROM t", &[]).unwrap();
        assert_eq!(rows[0].get("n"), Some(&SqlValue::Integer(0)));
    }
}
